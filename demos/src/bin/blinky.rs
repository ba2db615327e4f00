//! Two tasks blinking the red and green LEDs, out of phase with nothing
//!
//! Each task sleeps a second, turns its LED on, sleeps a second, turns it off
//! and sleeps another second. The buttons raise an interrupt that is only
//! acknowledged.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use core::fmt::Write as _;

use stm32f4xx_hal::pac::{self, interrupt};
use twinkle::{
    Arena, Scheduler,
    bringup::BringUp,
    clock::SystemClock,
    gpio::PortBits,
    periodic::{self, Step},
};
use twinkle_demos::{
    board::{self, LedPort, Nucleo},
    config,
    hooks::{BoardHooks, CPU_USAGE},
};

static STACKS: Arena<{ config::STACK_ARENA_BYTES }> = Arena::new();

static HOOKS: BoardHooks = BoardHooks::new();

static SCHEDULER: Scheduler = Scheduler::new(&STACKS, &HOOKS);

static SYSTEM_CLOCK: SystemClock = SystemClock::new();

static BRING_UP: BringUp = BringUp::new();

static LEDS: PortBits<LedPort> = PortBits::new(LedPort);

static TASK_1_STEPS: [Step; 5] = periodic::blink(config::LED_RED, config::BLINK_PERIOD);

static TASK_2_STEPS: [Step; 5] = periodic::blink(config::LED_GREEN, config::BLINK_PERIOD);

#[cortex_m_rt::entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().expect("core peripherals taken twice");
    let dp = pac::Peripherals::take().expect("device peripherals taken twice");

    let mut nucleo = Nucleo::new(dp);
    let sysclk_hz = match BRING_UP.run(&mut nucleo, &config::CLOCK_PLAN, &SYSTEM_CLOCK) {
        Ok(hz) => hz,
        Err(e) => {
            defmt::error!("Bring-up failed: {}", e);
            twinkle::halt();
        }
    };

    if let Some(console) = nucleo.console() {
        // the banner is a courtesy; carry on without it
        let _ = writeln!(
            console,
            "twinkle: {} MHz, {}% busy\r",
            SYSTEM_CLOCK.hz() / 1_000_000,
            CPU_USAGE.whole_percent()
        );
    }
    defmt::info!("Clock {=u32} Hz, console {=u32} baud", sysclk_hz, config::CONSOLE_BAUD);

    SCHEDULER.spawn(
        "Task 1",
        task_1,
        config::TASK_1_STACK_WORDS,
        config::TASK_PRIORITY,
    );
    SCHEDULER.spawn(
        "Task 2",
        task_2,
        config::TASK_2_STACK_WORDS,
        config::TASK_PRIORITY,
    );

    // SAFETY: the handler only acknowledges, so it cannot break any
    // critical section by running early
    unsafe {
        cp.NVIC
            .set_priority(pac::Interrupt::EXTI15_10, config::BUTTON_IRQ_PRIORITY);
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::EXTI15_10);
    }

    let systicks_per_sched_tick = sysclk_hz / twinkle::config::TICK_HZ;
    SCHEDULER.start(cp.SYST, cp.SCB, systicks_per_sched_tick);
}

/// Blinks the red LED
fn task_1() -> ! {
    blinker(&TASK_1_STEPS, config::LED_RED)
}

/// Blinks the green LED
fn task_2() -> ! {
    blinker(&TASK_2_STEPS, config::LED_GREEN)
}

/// Claim `mask` and run `steps` on it for ever
fn blinker(steps: &'static [Step], mask: u32) -> ! {
    match LEDS.claim(mask) {
        Ok(bits) => {
            defmt::info!("{} owns LEDs 0x{=u32:02x}", twinkle::task_id(), bits.mask());
            periodic::run(steps, &bits)
        }
        Err(e) => {
            defmt::error!("{} cannot have its LEDs: {}", twinkle::task_id(), e);
            twinkle::halt()
        }
    }
}

/// Both buttons, either edge
#[interrupt]
fn EXTI15_10() {
    board::acknowledge_buttons();
}

// End of File
