//! Room domain types.
//!
//! # Invariants
//!
//! - A [`TargetTemperature`] is always in `[15.0, 30.0]` and a multiple of
//!   0.5. The only way to build one is through [`TargetTemperature::new`],
//!   which clamps and rounds.
//! - When `auto_mode` is set the AC state is server-controlled; see
//!   [`RoomState::ac_control_locked`].

use std::{borrow::Borrow, fmt};

use roomsync_proto::SensorPayload;

/// Opaque, stable room identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Sensor kinds a room may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Air temperature.
    Temperature,
    /// Relative humidity.
    Humidity,
    /// Atmospheric pressure. Most rooms have none.
    Pressure,
}

impl SensorKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 3] = [Self::Temperature, Self::Humidity, Self::Pressure];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Pressure => "Pressure",
        }
    }
}

/// One sensor measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Measured value.
    pub value: f64,
    /// Display unit.
    pub unit: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

impl SensorReading {
    /// Create a reading.
    pub fn new(value: f64, unit: impl Into<String>, timestamp: u64) -> Self {
        Self { value, unit: unit.into(), timestamp }
    }
}

impl From<SensorPayload> for SensorReading {
    fn from(payload: SensorPayload) -> Self {
        Self { value: payload.valeur, unit: payload.unite, timestamp: payload.timestamp }
    }
}

/// Target temperature in °C, clamped to the controllable range and snapped
/// to half degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TargetTemperature(f64);

impl TargetTemperature {
    /// Lowest settable target.
    pub const MIN: f64 = 15.0;
    /// Highest settable target.
    pub const MAX: f64 = 30.0;
    /// Increment of the +/- controls and the rounding grid.
    pub const STEP: f64 = 0.5;
    /// Target of a freshly created room.
    pub const DEFAULT: Self = Self(21.0);

    /// Clamp to `[MIN, MAX]` and round to the nearest `STEP`.
    ///
    /// NaN maps to [`Self::DEFAULT`].
    pub fn new(celsius: f64) -> Self {
        if celsius.is_nan() {
            return Self::DEFAULT;
        }
        let clamped = celsius.clamp(Self::MIN, Self::MAX);
        Self((clamped / Self::STEP).round() * Self::STEP)
    }

    /// Value in °C.
    pub fn celsius(self) -> f64 {
        self.0
    }

    /// One step up, saturating at `MAX`.
    #[must_use]
    pub fn step_up(self) -> Self {
        Self::new(self.0 + Self::STEP)
    }

    /// One step down, saturating at `MIN`.
    #[must_use]
    pub fn step_down(self) -> Self {
        Self::new(self.0 - Self::STEP)
    }
}

impl Default for TargetTemperature {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TargetTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.0)
    }
}

/// Controllable fields of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Target temperature.
    TargetTemperature,
    /// Air conditioning on/off.
    AcActive,
    /// Server-driven automatic mode.
    AutoMode,
}

impl Field {
    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::TargetTemperature => "target temperature",
            Self::AcActive => "air conditioning",
            Self::AutoMode => "auto mode",
        }
    }
}

/// A value for one [`Field`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Target temperature.
    TargetTemperature(TargetTemperature),
    /// Air conditioning on/off.
    AcActive(bool),
    /// Automatic mode on/off.
    AutoMode(bool),
}

impl FieldValue {
    /// Which field this value belongs to.
    pub fn field(&self) -> Field {
        match self {
            Self::TargetTemperature(_) => Field::TargetTemperature,
            Self::AcActive(_) => Field::AcActive,
            Self::AutoMode(_) => Field::AutoMode,
        }
    }
}

/// Everything the client knows about one room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    /// Room identifier.
    pub id: RoomId,
    /// Temperature reading, if the room has that sensor.
    pub temperature: Option<SensorReading>,
    /// Humidity reading.
    pub humidity: Option<SensorReading>,
    /// Pressure reading.
    pub pressure: Option<SensorReading>,
    /// Target temperature.
    pub target_temperature: TargetTemperature,
    /// Air conditioning running.
    pub ac_active: bool,
    /// Server-driven automatic mode.
    pub auto_mode: bool,
}

impl RoomState {
    /// Room shown locally after a creation the backend has not reported yet:
    /// no sensors, default target, AC off, auto mode on.
    pub fn placeholder(id: RoomId) -> Self {
        Self {
            id,
            temperature: None,
            humidity: None,
            pressure: None,
            target_temperature: TargetTemperature::DEFAULT,
            ac_active: false,
            auto_mode: true,
        }
    }

    /// Reading for a sensor kind.
    pub fn sensor(&self, kind: SensorKind) -> Option<&SensorReading> {
        match kind {
            SensorKind::Temperature => self.temperature.as_ref(),
            SensorKind::Humidity => self.humidity.as_ref(),
            SensorKind::Pressure => self.pressure.as_ref(),
        }
    }

    /// Mutable slot for a sensor kind.
    pub fn sensor_slot(&mut self, kind: SensorKind) -> &mut Option<SensorReading> {
        match kind {
            SensorKind::Temperature => &mut self.temperature,
            SensorKind::Humidity => &mut self.humidity,
            SensorKind::Pressure => &mut self.pressure,
        }
    }

    /// Newest timestamp across all sensors.
    pub fn latest_timestamp(&self) -> Option<u64> {
        SensorKind::ALL.iter().filter_map(|&kind| self.sensor(kind)).map(|r| r.timestamp).max()
    }

    /// Whether the user may toggle the AC directly. False in auto mode.
    pub fn ac_control_locked(&self) -> bool {
        self.auto_mode
    }

    /// Current value of a controllable field.
    pub fn field(&self, field: Field) -> FieldValue {
        match field {
            Field::TargetTemperature => FieldValue::TargetTemperature(self.target_temperature),
            Field::AcActive => FieldValue::AcActive(self.ac_active),
            Field::AutoMode => FieldValue::AutoMode(self.auto_mode),
        }
    }

    /// Overwrite a controllable field.
    pub fn set_field(&mut self, value: FieldValue) {
        match value {
            FieldValue::TargetTemperature(target) => self.target_temperature = target,
            FieldValue::AcActive(active) => self.ac_active = active,
            FieldValue::AutoMode(auto) => self.auto_mode = auto,
        }
    }
}
