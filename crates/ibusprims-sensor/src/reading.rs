//! Where sensor readings come from.
//!
//! A [`ReadingSource`] is asked for a value on every `SENSOR_READ` poll. The
//! dispatcher truncates it to the identity's byte width, low byte first.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Produces the current sensor value.
pub trait ReadingSource {
    fn read(&self) -> u32;
}

impl<F: Fn() -> u32> ReadingSource for F {
    fn read(&self) -> u32 {
        self()
    }
}

/// A constant value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedReading(pub u32);

impl ReadingSource for FixedReading {
    fn read(&self) -> u32 {
        self.0
    }
}

/// A value the owner updates between polls (e.g. from a measurement thread).
#[derive(Debug, Clone, Default)]
pub struct SharedReading(Arc<AtomicU32>);

impl SharedReading {
    pub fn new(initial: u32) -> Self {
        Self(Arc::new(AtomicU32::new(initial)))
    }

    pub fn set(&self, value: u32) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl ReadingSource for SharedReading {
    fn read(&self) -> u32 {
        self.get()
    }
}

/// Convert a raw 10-bit ADC sample to 0.01 V units.
///
/// Assumes a 3.3 V reference and a 5.7:1 resistor divider in front of the
/// ADC pin.
pub fn centivolts_from_adc(raw: u16) -> u32 {
    (u32::from(raw) * 33 * 57) >> 8
}

/// Wraps a raw ADC source and reports 0.01 V units.
#[derive(Debug, Clone)]
pub struct AdcVoltage<S> {
    adc: S,
}

impl<S: ReadingSource> AdcVoltage<S> {
    pub fn new(adc: S) -> Self {
        Self { adc }
    }
}

impl<S: ReadingSource> ReadingSource for AdcVoltage<S> {
    fn read(&self) -> u32 {
        let raw = self.adc.read().min(u32::from(u16::MAX)) as u16;
        centivolts_from_adc(raw)
    }
}

/// LiPo discharge curves, 0.01 V per pack, in 5 % steps from 0 % to 100 %.
/// Columns: 3S, 4S.
const DISCHARGE: [[u32; 2]; 21] = [
    [982, 1309],
    [1083, 1443],
    [1106, 1475],
    [1112, 1483],
    [1118, 1491],
    [1124, 1499],
    [1130, 1506],
    [1136, 1514],
    [1139, 1518],
    [1145, 1526],
    [1151, 1534],
    [1156, 1542],
    [1162, 1550],
    [1174, 1566],
    [1186, 1581],
    [1195, 1593],
    [1207, 1609],
    [1225, 1633],
    [1233, 1645],
    [1245, 1660],
    [1260, 1680],
];

/// Percent reported while the supply settles after power-up.
pub const BATTERY_FULL: u32 = 100;

/// Default settle time before [`BatteryPercent`] trusts the voltage.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

/// Remaining battery percent for a pack voltage in 0.01 V units.
///
/// The pack size (3S or 4S) is picked from whichever table spans the
/// voltage. The result is the lower 5 % step of the bracket the voltage
/// falls in; voltages outside both tables report 0.
pub fn battery_percent(centivolts: u32) -> u32 {
    let Some(column) = (0..2).find(|&c| {
        centivolts >= DISCHARGE[0][c] && centivolts <= DISCHARGE[DISCHARGE.len() - 1][c]
    }) else {
        return 0;
    };

    DISCHARGE
        .windows(2)
        .position(|step| centivolts > step[0][column] && centivolts <= step[1][column])
        .map(|step| step as u32 * 5)
        .unwrap_or(0)
}

/// Reports remaining battery percent from a pack-voltage source.
#[derive(Debug, Clone)]
pub struct BatteryPercent<S> {
    voltage: S,
    started: Instant,
    settle: Duration,
}

impl<S: ReadingSource> BatteryPercent<S> {
    /// `voltage` must report 0.01 V units.
    pub fn new(voltage: S) -> Self {
        Self::with_settle(voltage, DEFAULT_SETTLE)
    }

    /// Report [`BATTERY_FULL`] for `settle` after construction.
    pub fn with_settle(voltage: S, settle: Duration) -> Self {
        Self {
            voltage,
            started: Instant::now(),
            settle,
        }
    }
}

impl<S: ReadingSource> ReadingSource for BatteryPercent<S> {
    fn read(&self) -> u32 {
        if self.started.elapsed() < self.settle {
            return BATTERY_FULL;
        }
        battery_percent(self.voltage.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_and_closure_sources() {
        assert_eq!(FixedReading(228).read(), 228);

        let closure = || 740u32;
        assert_eq!(closure.read(), 740);
    }

    #[test]
    fn shared_reading_updates_between_reads() {
        let reading = SharedReading::new(100);
        let handle = reading.clone();

        assert_eq!(reading.read(), 100);
        handle.set(250);
        assert_eq!(reading.read(), 250);
    }

    #[test]
    fn adc_conversion() {
        assert_eq!(centivolts_from_adc(0), 0);
        // 1023 * 1881 >> 8
        assert_eq!(centivolts_from_adc(1023), 7516);
        assert_eq!(AdcVoltage::new(FixedReading(512)).read(), (512 * 1881) >> 8);
    }

    #[test]
    fn battery_percent_3s() {
        assert_eq!(battery_percent(982), 0);
        assert_eq!(battery_percent(1000), 0);
        assert_eq!(battery_percent(1083), 0);
        assert_eq!(battery_percent(1084), 5);
        assert_eq!(battery_percent(1151), 45);
        assert_eq!(battery_percent(1260), 95);
    }

    #[test]
    fn battery_percent_4s() {
        assert_eq!(battery_percent(1500), 25);
        assert_eq!(battery_percent(1680), 95);
    }

    #[test]
    fn battery_percent_out_of_range() {
        assert_eq!(battery_percent(740), 0);
        assert_eq!(battery_percent(1290), 0);
        assert_eq!(battery_percent(1700), 0);
    }

    #[test]
    fn battery_reports_full_while_settling() {
        let battery = BatteryPercent::with_settle(FixedReading(1000), Duration::from_secs(60));
        assert_eq!(battery.read(), BATTERY_FULL);

        let settled = BatteryPercent::with_settle(FixedReading(1151), Duration::ZERO);
        assert_eq!(settled.read(), 45);
    }
}
