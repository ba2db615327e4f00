//! The Nucleo-F401RE, as a twinkle [`Platform`]

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use stm32f4xx_hal::{
    gpio::{Edge, Output, PC1, PC2, PC3, PC10, PC13},
    pac,
    prelude::*,
    rcc::{CFGR, Clocks},
    serial::{Config, Serial},
};
use twinkle::{Error, Result, bringup::Platform, clock::{ClockPlan, ClockSource}, gpio::OutputPort};

use crate::config;

/// Peripherals that keep their clocks while the core sleeps: flash
/// interface, SRAM1, GPIOA and GPIOC
const AHB1_SLEEP_KEEP: u32 = (1 << 15) | (1 << 16) | (1 << 0) | (1 << 2);

/// As above: TIM2 and USART2
const APB1_SLEEP_KEEP: u32 = (1 << 0) | (1 << 17);

/// As above: SYSCFG, which holds the EXTI line routing
const APB2_SLEEP_KEEP: u32 = 1 << 14;

/// TIM2EN in RCC_APB1ENR
const APB1_TIM2_ENABLE: u32 = 1 << 0;

/// The board's peripherals, each handed out to the bring-up stage that
/// configures it
pub struct Nucleo {
    cfgr: Option<CFGR>,
    clocks: Option<Clocks>,
    tim2: Option<pac::TIM2>,
    usart2: Option<pac::USART2>,
    gpioa: Option<pac::GPIOA>,
    gpioc: Option<pac::GPIOC>,
    syscfg: Option<pac::SYSCFG>,
    exti: pac::EXTI,
    console: Option<Serial<pac::USART2>>,
    buttons: Option<(PC13, PC10)>,
    spare_pins: Option<(PC1, PC2, PC3)>,
    leds: Option<(PC1<Output>, PC2<Output>, PC3<Output>)>,
}

impl Nucleo {
    /// Take the peripherals we need. Nothing is configured yet.
    pub fn new(dp: pac::Peripherals) -> Nucleo {
        let rcc = dp.RCC.constrain();
        Nucleo {
            cfgr: Some(rcc.cfgr),
            clocks: None,
            tim2: Some(dp.TIM2),
            usart2: Some(dp.USART2),
            gpioa: Some(dp.GPIOA),
            gpioc: Some(dp.GPIOC),
            syscfg: Some(dp.SYSCFG),
            exti: dp.EXTI,
            console: None,
            buttons: None,
            spare_pins: None,
            leds: None,
        }
    }

    /// The serial console, once it is configured
    pub fn console(&mut self) -> Option<&mut Serial<pac::USART2>> {
        self.console.as_mut()
    }
}

/// Take a peripheral out of its slot, or say which one was missing
fn take<T>(slot: &mut Option<T>, name: &'static str) -> Result<T> {
    slot.take().ok_or(Error::PeripheralMissing(name))
}

impl Platform for Nucleo {
    fn set_system_clock(&mut self, plan: &ClockPlan) -> Result<u32> {
        let cfgr = take(&mut self.cfgr, "RCC")?;
        let cfgr = match plan.source {
            ClockSource::Internal => cfgr,
            ClockSource::External { hz } => cfgr.use_hse(hz.Hz()),
        };
        let clocks = cfgr.sysclk(plan.sysclk_hz.Hz()).freeze();
        let actual = clocks.sysclk().raw();
        self.clocks = Some(clocks);
        Ok(actual)
    }

    fn enable_sleep_gating(&mut self) -> Result<()> {
        // SAFETY: `constrain` kept the RCC for the HAL, which never touches
        // the *LPENR registers. Only this stage writes them.
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.ahb1lpenr.write(|w| unsafe { w.bits(AHB1_SLEEP_KEEP) });
        rcc.ahb2lpenr.write(|w| unsafe { w.bits(0) });
        rcc.apb1lpenr.write(|w| unsafe { w.bits(APB1_SLEEP_KEEP) });
        rcc.apb2lpenr.write(|w| unsafe { w.bits(APB2_SLEEP_KEEP) });
        Ok(())
    }

    fn start_cpu_usage_timer(&mut self, sysclk_hz: u32) -> Result<()> {
        let tim2 = take(&mut self.tim2, "TIM2")?;
        // SAFETY: a single read-modify-write from Thread Mode, before any
        // interrupt that could touch RCC is enabled
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr
            .modify(|r, w| unsafe { w.bits(r.bits() | APB1_TIM2_ENABLE) });
        // free-running, one count per timer clock (APB1 is undivided at 40 MHz)
        tim2.psc.write(|w| unsafe { w.bits(0) });
        tim2.arr.write(|w| unsafe { w.bits(u32::MAX) });
        // UG, to load the prescaler
        tim2.egr.write(|w| unsafe { w.bits(1) });
        // CEN
        tim2.cr1.write(|w| unsafe { w.bits(1) });
        crate::hooks::CPU_USAGE.restart(usage_timer_now());
        defmt::debug!("CPU usage timer counting at {=u32} Hz", sysclk_hz);
        Ok(())
    }

    fn configure_console(&mut self, baud: u32, sysclk_hz: u32) -> Result<()> {
        let clocks = self.clocks.ok_or(Error::PeripheralMissing("clocks"))?;
        let usart2 = take(&mut self.usart2, "USART2")?;
        let gpioa = take(&mut self.gpioa, "GPIOA")?.split();
        // PA2/PA3 go to the ST-LINK virtual COM port
        let pins = (gpioa.pa2.into_alternate::<7>(), gpioa.pa3.into_alternate::<7>());
        let serial = Serial::new(usart2, pins, Config::default().baudrate(baud.bps()), &clocks)
            .map_err(|_| Error::Console)?;
        defmt::debug!("Console at {=u32} baud from {=u32} Hz", baud, sysclk_hz);
        self.console = Some(serial);
        Ok(())
    }

    fn configure_buttons(&mut self) -> Result<()> {
        let gpioc = take(&mut self.gpioc, "GPIOC")?.split();
        let mut syscfg = take(&mut self.syscfg, "SYSCFG")?.constrain();

        let mut user = gpioc.pc13.into_pull_up_input();
        let mut second = gpioc.pc10.into_pull_up_input();
        user.make_interrupt_source(&mut syscfg);
        user.trigger_on_edge(&mut self.exti, Edge::RisingFalling);
        user.enable_interrupt(&mut self.exti);
        second.make_interrupt_source(&mut syscfg);
        second.trigger_on_edge(&mut self.exti, Edge::RisingFalling);
        second.enable_interrupt(&mut self.exti);

        self.buttons = Some((user, second));
        self.spare_pins = Some((gpioc.pc1, gpioc.pc2, gpioc.pc3));
        Ok(())
    }

    fn configure_leds(&mut self) -> Result<()> {
        let (red, blue, green) = take(&mut self.spare_pins, "PC1-PC3")?;
        let mut red = red.into_push_pull_output();
        let mut blue = blue.into_push_pull_output();
        let mut green = green.into_push_pull_output();
        red.set_low();
        blue.set_low();
        green.set_low();
        self.leds = Some((red, blue, green));
        Ok(())
    }
}

/// The LED pins of GPIOC, written through the bit set/reset register
///
/// A BSRR write only changes the bits it names, so tasks owning different
/// bits never race.
pub struct LedPort;

impl OutputPort for LedPort {
    fn write_masked(&self, mask: u32, value: u32) {
        let mask = mask & config::LED_ALL;
        let set = value & mask;
        let reset = !value & mask;
        // SAFETY: BSRR is write-only and stateless, and the pins were
        // configured as outputs during bring-up
        unsafe {
            (*pac::GPIOC::ptr())
                .bsrr
                .write(|w| w.bits(set | (reset << 16)));
        }
    }
}

/// Clear the pending flags of both button lines
///
/// Call from the EXTI handler, or it fires again straight away.
pub fn acknowledge_buttons() {
    // SAFETY: PR is write-one-to-clear, so this only touches our two lines
    unsafe {
        (*pac::EXTI::ptr())
            .pr
            .write(|w| w.bits(config::BUTTON_LINES));
    }
}

/// The free-running count of the CPU usage timer
pub fn usage_timer_now() -> u32 {
    // SAFETY: a read of a counter register, which has no side effects
    unsafe { (*pac::TIM2::ptr()).cnt.read().bits() }
}

// End of File
