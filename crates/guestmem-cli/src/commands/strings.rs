//! Strings command implementation.
//!
//! Resolves a pointer table into a dictionary and prints it as JSON, one entry
//! per distinct address in ascending order.

use std::collections::HashMap;

use anyhow::Result;
use guestmem::{Config, GuestAddress};
use serde::Serialize;

use super::hex_utils::{format_guest_address, parse_guest_addresses};

#[derive(Debug, Serialize, PartialEq)]
pub struct Entry<V> {
    pub address: String,
    pub value: V,
}

/// Run the strings command
pub fn run(config: &Config, pid: Option<u32>, addresses: &[String], offset: usize) -> Result<()> {
    let addresses = parse_guest_addresses(addresses)?;
    let attachment = super::attach(config, pid)?;
    let dictionary = attachment
        .session()?
        .build_string_dictionary(&addresses, offset)?;

    println!("{}", serde_json::to_string_pretty(&entries(dictionary))?);
    Ok(())
}

/// Flatten a dictionary into entries sorted by address
pub fn entries<V>(dictionary: HashMap<GuestAddress, V>) -> Vec<Entry<V>> {
    let mut pairs: Vec<(GuestAddress, V)> = dictionary.into_iter().collect();
    pairs.sort_by_key(|(address, _)| *address);
    pairs
        .into_iter()
        .map(|(address, value)| Entry {
            address: format_guest_address(address),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_sorted_by_address() {
        let dictionary = HashMap::from([
            (0x20, "b".to_string()),
            (0, String::new()),
            (0x10, "a".to_string()),
        ]);
        let entries = entries(dictionary);
        let addresses: Vec<&str> = entries.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(addresses, vec!["0x0", "0x10", "0x20"]);
        assert_eq!(entries[1].value, "a");
    }

    #[test]
    fn test_entries_json_shape() {
        let json = serde_json::to_value(entries(HashMap::from([(0x10, vec!["x".to_string()])])))
            .unwrap();
        assert_eq!(json, serde_json::json!([{ "address": "0x10", "value": ["x"] }]));
    }
}
