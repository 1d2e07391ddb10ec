//! # Protocol Bridge
//!
//! This module is responsible for handling the communication between the host and the
//! MCU. It uses a UART to receive commands from the host, decode them, and dispatch
//! actions to other tasks. It also sends responses and other messages back to the host.
//!
//! ## Klipper Protocol
//!
//! The communication between the host and the MCU uses a custom binary protocol defined
//! in the `klipper-proto` crate. The protocol is designed to be efficient and
//! reliable, with features like command compression and checksums to ensure data
//! integrity.
//!
//! ## Command Dispatch
//!
//! When a command is received from the host, the protocol bridge decodes it and
//! dispatches the corresponding action to the appropriate task. For example, a move
//! command would be sent to the stepper task, while a set heater temperature command
//! would be sent to the heater task.

use embassy_stm32::usart::{Uart, UartTx, UartRx};
use embassy_stm32::peripherals::USART1;
use embassy_stm32::gpio::{AnyPin, Pin};


/// The protocol bridge task.
///
/// This task handles the communication between the host and the MCU.
#[embassy_executor::task]
pub async fn proto_task(_usart: USART1, _rx_pin: AnyPin, _tx_pin: AnyPin) {
    defmt::info!("Protocol bridge task started");

    // TODO: In a real implementation:
    // 1. Initialize UART with DMA.
    // 2. Create a parser for the Klipper protocol.
    // 3. Loop, reading data, parsing messages, and dispatching to other tasks
    //    via channels or shared state.
    loop {
        embassy_time::Timer::after(embassy_time::Duration::from_secs(5)).await;
        defmt::info!("Pretending to parse a message...");
    }
}