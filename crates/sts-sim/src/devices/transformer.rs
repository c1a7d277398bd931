//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Device models producing per-tick telemetry payloads."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use anyhow::Result;
use serde_json::Value;
use strum::IntoStaticStr;

use crate::context::{round_to, SimulationContext, TrendSpec};
use crate::payload::{DeviceStatus, Payload, PumpState};
use crate::registry::FaultSnapshot;

use super::TelemetrySource;

/// Fault kinds a power transformer recognizes. Anything else in the
/// registry for this target reads as inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransformerFault {
    Overload,
    CoolingFault,
    C2h2Spike,
    OilPressureHigh,
    OilPressureLow,
    OilTempHigh,
    Pump1Fault,
    Pump2Fault,
    Pump3Fault,
}

impl TransformerFault {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Manual-stop flags, ranked below faults in the status precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransformerStop {
    Pump1Stop,
    Pump2Stop,
    Pump3Stop,
}

impl TransformerStop {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

const PUMP_FAULTS: [TransformerFault; 3] = [
    TransformerFault::Pump1Fault,
    TransformerFault::Pump2Fault,
    TransformerFault::Pump3Fault,
];

const PUMP_STOPS: [TransformerStop; 3] = [
    TransformerStop::Pump1Stop,
    TransformerStop::Pump2Stop,
    TransformerStop::Pump3Stop,
];

const LOAD: TrendSpec = TrendSpec {
    nominal: 75.0,
    min: 60.0,
    max: 90.0,
    step: 2.5,
    oscillation: 0.2,
};
const LOAD_OVERLOAD: TrendSpec = TrendSpec {
    nominal: 110.0,
    min: 100.0,
    max: 120.0,
    step: 2.5,
    oscillation: 0.2,
};
const COOLING_FLOW: TrendSpec = TrendSpec {
    nominal: 40.0,
    min: 35.0,
    max: 45.0,
    step: 1.0,
    oscillation: 0.2,
};
const COOLING_FLOW_FAULT: TrendSpec = TrendSpec {
    nominal: 8.0,
    min: 2.0,
    max: 14.0,
    step: 1.5,
    oscillation: 0.3,
};
const OIL_PRESSURE: TrendSpec = TrendSpec {
    nominal: 30.0,
    min: 28.0,
    max: 32.0,
    step: 0.4,
    oscillation: 0.2,
};
const OIL_PRESSURE_HIGH: TrendSpec = TrendSpec {
    nominal: 36.0,
    min: 34.0,
    max: 38.0,
    step: 0.4,
    oscillation: 0.2,
};
const OIL_PRESSURE_LOW: TrendSpec = TrendSpec {
    nominal: 22.0,
    min: 20.0,
    max: 24.0,
    step: 0.4,
    oscillation: 0.2,
};
const TOP_OIL_TEMP: TrendSpec = TrendSpec {
    nominal: 65.0,
    min: 55.0,
    max: 75.0,
    step: 1.2,
    oscillation: 0.2,
};
const TOP_OIL_TEMP_HIGH: TrendSpec = TrendSpec {
    nominal: 95.0,
    min: 88.0,
    max: 102.0,
    step: 1.2,
    oscillation: 0.2,
};
const WINDING_TEMP: TrendSpec = TrendSpec {
    nominal: 80.0,
    min: 70.0,
    max: 90.0,
    step: 1.2,
    oscillation: 0.2,
};
const WINDING_TEMP_HIGH: TrendSpec = TrendSpec {
    nominal: 105.0,
    min: 98.0,
    max: 112.0,
    step: 1.2,
    oscillation: 0.2,
};
const C2H2_PPM: TrendSpec = TrendSpec {
    nominal: 0.5,
    min: 0.3,
    max: 0.8,
    step: 0.05,
    oscillation: 0.2,
};
const C2H2_PPM_SPIKE: TrendSpec = TrendSpec {
    nominal: 15.0,
    min: 10.0,
    max: 20.0,
    step: 1.0,
    oscillation: 0.25,
};
const H2_PPM: TrendSpec = TrendSpec {
    nominal: 12.0,
    min: 9.0,
    max: 15.0,
    step: 0.5,
    oscillation: 0.2,
};
const AMBIENT_TEMP_NOMINAL_C: f64 = 25.0;
const AMBIENT_TEMP_SPREAD_PCT: f64 = 10.0;
const AMBIENT_HUMIDITY_NOMINAL_PCT: f64 = 50.0;
const AMBIENT_HUMIDITY_SPREAD_PCT: f64 = 15.0;

const HOT_SPOT_OFFSET_C: f64 = 10.0;
const FAN_ON_ABOVE_C: f64 = 75.0;

const SILICON_START_PCT: f64 = 95.0;
const SILICON_FLOOR_PCT: f64 = 20.0;
const SILICON_DECAY_PER_TICK: f64 = 0.05;

/// Pump redundancy scheme of the transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformerClass {
    /// Two pumps nominally active, one standby.
    T3,
    /// One pump nominally active, two standby.
    T4,
}

impl TransformerClass {
    fn nominal_pumps(self) -> [PumpState; 3] {
        match self {
            TransformerClass::T3 => [PumpState::Active, PumpState::Active, PumpState::Standby],
            TransformerClass::T4 => [PumpState::Active, PumpState::Standby, PumpState::Standby],
        }
    }

    fn required_active(self) -> usize {
        match self {
            TransformerClass::T3 => 2,
            TransformerClass::T4 => 1,
        }
    }
}

/// Resolved boolean vector for one tick. All flags are read from the
/// snapshot before any value computation.
#[derive(Debug, Clone, Copy, Default)]
struct ActiveFaults {
    overload: bool,
    cooling: bool,
    c2h2_spike: bool,
    oil_pressure_high: bool,
    oil_pressure_low: bool,
    oil_temp_high: bool,
    pump_fault: [bool; 3],
    pump_stop: [bool; 3],
}

impl ActiveFaults {
    fn resolve(faults: &FaultSnapshot, target: &str) -> Self {
        let is = |fault: TransformerFault| faults.is_active(target, fault.name());
        let oil_pressure_high = is(TransformerFault::OilPressureHigh);
        // High wins when both halves of the pair are somehow set.
        let oil_pressure_low = !oil_pressure_high && is(TransformerFault::OilPressureLow);
        Self {
            overload: is(TransformerFault::Overload),
            cooling: is(TransformerFault::CoolingFault),
            c2h2_spike: is(TransformerFault::C2h2Spike),
            oil_pressure_high,
            oil_pressure_low,
            oil_temp_high: is(TransformerFault::OilTempHigh),
            pump_fault: PUMP_FAULTS.map(|fault| faults.is_active(target, fault.name())),
            pump_stop: PUMP_STOPS.map(|stop| faults.is_active(target, stop.name())),
        }
    }

    fn any_fault(&self) -> bool {
        self.overload
            || self.cooling
            || self.c2h2_spike
            || self.oil_pressure_high
            || self.oil_pressure_low
            || self.oil_temp_high
            || self.pump_fault.iter().any(|&flag| flag)
    }

    fn any_manual_stop(&self) -> bool {
        self.pump_stop.iter().any(|&flag| flag)
    }
}

/// Power transformer model with redundant cooling pumps and a desiccant
/// breather level.
#[derive(Debug)]
pub struct Transformer {
    name: String,
    class: TransformerClass,
    pumps: [PumpState; 3],
    silicon_level: f64,
}

impl Transformer {
    pub fn new(name: impl Into<String>, class: TransformerClass) -> Self {
        Self {
            name: name.into(),
            class,
            pumps: class.nominal_pumps(),
            silicon_level: SILICON_START_PCT,
        }
    }

    pub fn pump_states(&self) -> [PumpState; 3] {
        self.pumps
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.name, suffix)
    }

    /// Reassign the three pumps from the class nominal, overlaying the
    /// tick's stop and fault flags. A faulted pump drops to standby; when
    /// that leaves fewer than the required active pumps, every healthy
    /// standby pump is brought in, skipping manually stopped ones.
    fn update_pumps(&mut self, flags: &ActiveFaults) {
        let mut pumps = self.class.nominal_pumps();
        for i in 0..3 {
            if flags.pump_stop[i] {
                pumps[i] = PumpState::ManualStopped;
            } else if flags.pump_fault[i] {
                pumps[i] = PumpState::Standby;
            }
        }
        let healthy = |i: usize| !flags.pump_fault[i] && !flags.pump_stop[i];
        let active = (0..3)
            .filter(|&i| pumps[i] == PumpState::Active && healthy(i))
            .count();
        if active < self.class.required_active() {
            for i in 0..3 {
                if pumps[i] == PumpState::Standby && healthy(i) {
                    pumps[i] = PumpState::Active;
                }
            }
        }
        self.pumps = pumps;
    }

    /// Desiccant degrades a fixed amount per tick and is swapped for a
    /// fresh charge once it would fall below the floor.
    fn advance_silicon(&mut self) -> f64 {
        let next = self.silicon_level - SILICON_DECAY_PER_TICK;
        self.silicon_level = if next < SILICON_FLOOR_PCT {
            SILICON_START_PCT
        } else {
            next
        };
        round_to(self.silicon_level, 2)
    }
}

impl TelemetrySource for Transformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_data(
        &mut self,
        ctx: &mut SimulationContext,
        faults: &FaultSnapshot,
    ) -> Result<Payload> {
        let flags = ActiveFaults::resolve(faults, &self.name);
        let status = DeviceStatus::resolve(flags.any_fault(), flags.any_manual_stop());
        self.update_pumps(&flags);

        let load_pct = if flags.overload {
            ctx.trend(&self.key("load_overload"), &LOAD_OVERLOAD)
        } else {
            ctx.trend(&self.key("load"), &LOAD)
        };
        let cooling_flow = if flags.cooling {
            ctx.trend(&self.key("cooling_flow_fault"), &COOLING_FLOW_FAULT)
        } else {
            ctx.trend(&self.key("cooling_flow"), &COOLING_FLOW)
        };
        let oil_pressure = if flags.oil_pressure_high {
            ctx.trend(&self.key("oil_pressure_high"), &OIL_PRESSURE_HIGH)
        } else if flags.oil_pressure_low {
            ctx.trend(&self.key("oil_pressure_low"), &OIL_PRESSURE_LOW)
        } else {
            ctx.trend(&self.key("oil_pressure"), &OIL_PRESSURE)
        };
        let top_oil_temp = if flags.oil_temp_high {
            ctx.trend(&self.key("top_oil_temp_fault"), &TOP_OIL_TEMP_HIGH)
        } else {
            ctx.trend(&self.key("top_oil_temp"), &TOP_OIL_TEMP)
        };
        let winding_temp = if flags.oil_temp_high {
            ctx.trend(&self.key("winding_temp_fault"), &WINDING_TEMP_HIGH)
        } else {
            ctx.trend(&self.key("winding_temp"), &WINDING_TEMP)
        };
        let c2h2_ppm = if flags.c2h2_spike {
            ctx.trend(&self.key("c2h2_spike"), &C2H2_PPM_SPIKE)
        } else {
            ctx.trend(&self.key("c2h2"), &C2H2_PPM)
        };
        let h2_ppm = ctx.trend(&self.key("h2"), &H2_PPM);
        // Ambient conditions are uncorrelated tick to tick; plain jitter
        // rather than a walk.
        let ambient_temp = ctx.noise(AMBIENT_TEMP_NOMINAL_C, AMBIENT_TEMP_SPREAD_PCT, 2);
        let ambient_humidity =
            ctx.noise(AMBIENT_HUMIDITY_NOMINAL_PCT, AMBIENT_HUMIDITY_SPREAD_PCT, 2);

        // Derived fields are computed from the already-faulted base values
        // so they stay physically consistent with the fault in effect.
        let hot_spot_temp = round_to(winding_temp + HOT_SPOT_OFFSET_C, 2);
        let fan_status = if top_oil_temp > FAN_ON_ABOVE_C {
            "ON"
        } else {
            "OFF"
        };
        let silicon_level = self.advance_silicon();
        let tap_position = ctx.integer(1, 9);

        let mut payload = Payload::new();
        payload.insert(self.key("cooling_flow_lps"), Value::from(cooling_flow));
        payload.insert(self.key("top_oil_temp"), Value::from(top_oil_temp));
        payload.insert(self.key("winding_temp"), Value::from(winding_temp));
        payload.insert(self.key("hot_spot_temp"), Value::from(hot_spot_temp));
        payload.insert(self.key("ambient_temp"), Value::from(ambient_temp));
        payload.insert(self.key("ambient_humidity"), Value::from(ambient_humidity));
        payload.insert(self.key("oil_pressure"), Value::from(oil_pressure));
        payload.insert(self.key("H2_ppm"), Value::from(h2_ppm));
        payload.insert(self.key("C2H2_ppm"), Value::from(c2h2_ppm));
        payload.insert(self.key("fan_status"), Value::from(fan_status));
        for (i, pump) in self.pumps.iter().enumerate() {
            payload.insert(
                self.key(&format!("pump{}_status", i + 1)),
                Value::from(pump.code()),
            );
        }
        payload.insert(self.key("silicon_level_pct"), Value::from(silicon_level));
        payload.insert(self.key("tap_changer_position"), Value::from(tap_position));
        payload.insert(self.key("transformer_load_pct"), Value::from(load_pct));
        payload.insert(self.key("status"), Value::from(status.code()));
        Ok(payload)
    }
}
