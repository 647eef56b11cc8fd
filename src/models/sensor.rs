use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::record::value_as_id;

/// One measurement stream discovered through the locations endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub sensor_id: u64,
    pub parameter: Option<String>,
    pub location_id: Option<u64>,
    pub location_name: Option<String>,
    pub state: String,
}

impl SensorDescriptor {
    pub fn new(
        sensor_id: u64,
        parameter: Option<String>,
        location_id: Option<u64>,
        location_name: Option<String>,
        state: String,
    ) -> Self {
        Self {
            sensor_id,
            parameter,
            location_id,
            location_name,
            state,
        }
    }

    /// Expand one location result into its sensors. Sensors without an id
    /// cannot be queried and are skipped.
    pub fn from_location(location: &Value, state: &str) -> Vec<SensorDescriptor> {
        let location_id = value_as_id(location.get("id"));
        let location_name = location
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        location
            .get("sensors")
            .and_then(Value::as_array)
            .map(|sensors| {
                sensors
                    .iter()
                    .filter_map(|sensor| {
                        let sensor_id = value_as_id(sensor.get("id"))?;
                        let parameter = sensor
                            .get("parameter")
                            .and_then(|p| p.get("name"))
                            .and_then(Value::as_str)
                            .map(str::to_string);

                        Some(SensorDescriptor::new(
                            sensor_id,
                            parameter,
                            location_id,
                            location_name.clone(),
                            state.to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this sensor measures one of `parameters`; an empty list accepts all
    pub fn measures_any(&self, parameters: &[String]) -> bool {
        if parameters.is_empty() {
            return true;
        }

        self.parameter
            .as_deref()
            .map(|p| parameters.iter().any(|wanted| wanted.eq_ignore_ascii_case(p)))
            .unwrap_or(false)
    }

    /// Stamp the identifying fields onto a raw API record in place.
    /// Non-object records are left untouched.
    pub fn enrich(&self, record: &mut Value) {
        if let Value::Object(map) = record {
            map.insert("sensor_id".to_string(), Value::from(self.sensor_id));
            map.insert(
                "sensor_name".to_string(),
                self.location_name
                    .as_ref()
                    .map(|n| Value::from(n.as_str()))
                    .unwrap_or(Value::Null),
            );
            map.insert(
                "location_id".to_string(),
                self.location_id.map(Value::from).unwrap_or(Value::Null),
            );
            map.insert("state".to_string(), Value::from(self.state.as_str()));
        }
    }
}
