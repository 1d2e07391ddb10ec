//! Command model: a tagged-enum `Command` and a `no_std`, no-heap
//! line parser for the firmware's ASCII G-code subset.
//!
//! The host-side sibling of this parser (see `klipper-host::gcode`,
//! which this firmware's command dispatch is generalized from) keeps a
//! `String` and a `Vec<(char, f32)>` per line; neither is available
//! here. `Command` is instead a closed, `Copy` enum sized for the
//! firmware's fixed command set, and parsing writes directly into it
//! with no intermediate allocation.

#![allow(dead_code)]

/// One accepted line of G-code, reduced to its dispatch-relevant fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// G0/G1: linear move. Absent axis letters mean "unchanged" in
    /// absolute mode, or "zero displacement" in relative mode.
    LinearMove {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        f: Option<f64>,
    },
    /// G28: home the listed axes; no axis letters means "home all".
    Home { x: bool, y: bool, z: bool },
    SetAbsolutePositioning,
    SetRelativePositioning,
    /// M104: set hotend target, don't wait.
    SetHotendTemp { target_c: f64 },
    /// M109: set hotend target and wait (non-blocking at the dispatcher
    /// level, via the pending/service pattern) until within tolerance.
    WaitHotendTemp { target_c: f64 },
    /// M106: set fan speed, `0..=255`; missing `S` means full speed.
    SetFanSpeed { pwm_255: u16 },
    /// M107: fan off.
    FanOff,
    /// M114: report the current commanded position.
    ReportPosition,
    /// M105: report current/target temperature (ambient supplement,
    /// not in the base command table but present in every real
    /// G-code dialect and needed to observe heater state from the wire).
    ReportTemperature,
    /// M18 / M84: disable stepper motors (ambient supplement).
    DisableSteppers,
    /// A blank line or a comment-only line: acked, nothing dispatched.
    Empty,
}

/// Failure to parse or dispatch a line, reported back as `error: <kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    UnknownCommand,
    MalformedParameter,
}

impl CommandError {
    /// The exact `<kind>` token the design puts after `error: ` on the
    /// wire; kept as literal spec strings rather than a Display impl so
    /// the dispatcher never has to reformat them.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandError::UnknownCommand => "unknown command",
            CommandError::MalformedParameter => "parse error",
        }
    }
}

/// Strips an inline `;` comment (to end of line) and surrounding
/// whitespace, matching the slicer-emitted dialect the design targets.
fn strip_comment(line: &str) -> &str {
    let code = match line.find(';') {
        Some(i) => &line[..i],
        None => line,
    };
    code.trim()
}

/// Parses a decimal number (optional sign, optional fractional part) in
/// a `no_std`/no-alloc-friendly way; `core` does not implement `FromStr`
/// for floats without `std`.
fn parse_f64(token: &str) -> Option<f64> {
    let bytes = token.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut i = 0;
    let negative = match bytes[0] {
        b'-' => {
            i += 1;
            true
        }
        b'+' => {
            i += 1;
            false
        }
        _ => false,
    };
    if i >= bytes.len() {
        return None;
    }
    let mut int_part: i64 = 0;
    let mut saw_digit = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        int_part = int_part * 10 + (bytes[i] - b'0') as i64;
        saw_digit = true;
        i += 1;
    }
    let mut frac_part: f64 = 0.0;
    let mut frac_scale: f64 = 1.0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            frac_part = frac_part * 10.0 + (bytes[i] - b'0') as f64;
            frac_scale *= 10.0;
            saw_digit = true;
            i += 1;
        }
    }
    if !saw_digit || i != bytes.len() {
        return None;
    }
    let value = int_part as f64 + frac_part / frac_scale;
    Some(if negative { -value } else { value })
}

struct Params {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    e: Option<f64>,
    f: Option<f64>,
    s: Option<f64>,
}

fn parse_params(rest: &str) -> Result<Params, CommandError> {
    let mut p = Params {
        x: None,
        y: None,
        z: None,
        e: None,
        f: None,
        s: None,
    };
    for token in rest.split_whitespace() {
        let mut chars = token.chars();
        let letter = chars.next().ok_or(CommandError::MalformedParameter)?;
        let value_str = chars.as_str();
        let value = parse_f64(value_str).ok_or(CommandError::MalformedParameter)?;
        match letter.to_ascii_uppercase() {
            'X' => p.x = Some(value),
            'Y' => p.y = Some(value),
            'Z' => p.z = Some(value),
            'E' => p.e = Some(value),
            'F' => p.f = Some(value),
            'S' => p.s = Some(value),
            _ => return Err(CommandError::MalformedParameter),
        }
    }
    Ok(p)
}

/// Parses one line (already stripped of its CR/LF terminator by the
/// serial line assembler) into a [`Command`].
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let code = strip_comment(line);
    if code.is_empty() {
        return Ok(Command::Empty);
    }
    let mut parts = code.splitn(2, char::is_whitespace);
    let opcode = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("");
    let opcode_upper = opcode.to_ascii_uppercase();

    match opcode_upper.as_str() {
        "G0" | "G1" => {
            let p = parse_params(rest)?;
            Ok(Command::LinearMove {
                x: p.x,
                y: p.y,
                z: p.z,
                e: p.e,
                f: p.f,
            })
        }
        "G28" => {
            let p = parse_params(rest)?;
            if p.x.is_none() && p.y.is_none() && p.z.is_none() {
                Ok(Command::Home {
                    x: true,
                    y: true,
                    z: true,
                })
            } else {
                Ok(Command::Home {
                    x: p.x.is_some(),
                    y: p.y.is_some(),
                    z: p.z.is_some(),
                })
            }
        }
        "G90" => Ok(Command::SetAbsolutePositioning),
        "G91" => Ok(Command::SetRelativePositioning),
        "M104" => {
            let p = parse_params(rest)?;
            Ok(Command::SetHotendTemp {
                target_c: p.s.ok_or(CommandError::MalformedParameter)?,
            })
        }
        "M109" => {
            let p = parse_params(rest)?;
            Ok(Command::WaitHotendTemp {
                target_c: p.s.ok_or(CommandError::MalformedParameter)?,
            })
        }
        "M106" => {
            let p = parse_params(rest)?;
            let pwm = p.s.unwrap_or(255.0).clamp(0.0, 255.0) as u16;
            Ok(Command::SetFanSpeed { pwm_255: pwm })
        }
        "M107" => Ok(Command::FanOff),
        "M114" => Ok(Command::ReportPosition),
        "M105" => Ok(Command::ReportTemperature),
        "M18" | "M84" => Ok(Command::DisableSteppers),
        _ => Err(CommandError::UnknownCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linear_move_with_all_axes() {
        let cmd = parse("G1 X10 Y-5.5 Z0.2 F3000").unwrap();
        assert_eq!(
            cmd,
            Command::LinearMove {
                x: Some(10.0),
                y: Some(-5.5),
                z: Some(0.2),
                e: None,
                f: Some(3000.0),
            }
        );
    }

    #[test]
    fn g28_with_no_axes_means_home_all() {
        assert_eq!(
            parse("G28").unwrap(),
            Command::Home {
                x: true,
                y: true,
                z: true
            }
        );
    }

    #[test]
    fn g28_with_explicit_axis_homes_only_that_axis() {
        assert_eq!(
            parse("G28 Z").unwrap(),
            Command::Home {
                x: false,
                y: false,
                z: true
            }
        );
    }

    #[test]
    fn comment_only_line_is_empty() {
        assert_eq!(parse("; just a comment").unwrap(), Command::Empty);
        assert_eq!(parse("   ").unwrap(), Command::Empty);
    }

    #[test]
    fn inline_comment_is_stripped() {
        let cmd = parse("G1 X10 ; move over").unwrap();
        assert_eq!(
            cmd,
            Command::LinearMove {
                x: Some(10.0),
                y: None,
                z: None,
                e: None,
                f: None,
            }
        );
    }

    #[test]
    fn unknown_opcode_is_reported() {
        assert_eq!(parse("G999").unwrap_err(), CommandError::UnknownCommand);
    }

    #[test]
    fn malformed_parameter_is_reported() {
        assert_eq!(
            parse("G1 Xabc").unwrap_err(),
            CommandError::MalformedParameter
        );
    }

    #[test]
    fn m104_without_s_is_malformed() {
        assert_eq!(parse("M104").unwrap_err(), CommandError::MalformedParameter);
    }

    #[test]
    fn m106_without_s_defaults_to_full_speed() {
        assert_eq!(parse("M106").unwrap(), Command::SetFanSpeed { pwm_255: 255 });
    }

    #[test]
    fn m106_clamps_out_of_range_s() {
        assert_eq!(
            parse("M106 S999").unwrap(),
            Command::SetFanSpeed { pwm_255: 255 }
        );
    }

    #[test]
    fn case_insensitive_opcode_and_letters() {
        let cmd = parse("g1 x5").unwrap();
        assert_eq!(
            cmd,
            Command::LinearMove {
                x: Some(5.0),
                y: None,
                z: None,
                e: None,
                f: None,
            }
        );
    }
}
