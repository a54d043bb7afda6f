//! Fuzz target: schema composition from untrusted contributions.
//!
//! The input is split in two JSON documents; any pair that decodes is
//! merged and then used as a config contribution. Built-in properties
//! must always survive.
//!
//! cargo fuzz run fuzz_schema_merge

#![no_main]

use libfuzzer_sys::fuzz_target;
use rackctl::app::adoption::{ACTIVE_BRIGHTNESS_PERCENT, config_schema};
use rackctl::schema::merge;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let (left, right) = data.split_at(split);
    let right = right.get(1..).unwrap_or_default();

    let (Ok(mut dst), Ok(src)) = (
        serde_json::from_slice::<Value>(left),
        serde_json::from_slice::<Value>(right),
    ) else {
        return;
    };

    merge(&mut dst, &src);
    if !src.is_object() {
        assert_eq!(dst, src);
    }

    let schema = config_schema("Config", &dst);
    assert_eq!(
        schema["properties"][ACTIVE_BRIGHTNESS_PERCENT]["type"],
        "integer"
    );
});
