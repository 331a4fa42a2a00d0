#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nodestate_core::{Fields, Payload, Value};

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Number(i32),
    Text(String),
    Link(u8),
}

impl From<FuzzValue> for Value {
    fn from(value: FuzzValue) -> Self {
        match value {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Bool(b),
            FuzzValue::Number(n) => Value::Number(f64::from(n)),
            FuzzValue::Text(s) => Value::Text(s),
            FuzzValue::Link(id) => Value::Link(format!("node-{id}")),
        }
    }
}

fuzz_target!(|input: Vec<Vec<(u8, FuzzValue)>>| {
    let mut fields = Fields::new();
    for entries in input.into_iter().take(64) {
        let payload: Payload = entries
            .into_iter()
            .map(|(key, value)| (format!("f{}", key % 16), Value::from(value)))
            .collect();

        let before = fields.clone();
        fields.merge(&payload);

        for (key, value) in &payload {
            assert_eq!(fields.get(key), Some(value));
        }
        for (key, value) in before.iter() {
            if !payload.contains(key) {
                assert_eq!(fields.get(key), Some(value));
            }
        }
        assert!(fields.len() >= before.len());
        assert_eq!(fields.merge(&payload), 0, "second merge changes nothing");
    }
});
