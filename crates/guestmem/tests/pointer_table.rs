//! End-to-end pointer-table resolution through an attached mock process

use std::collections::HashMap;
use std::sync::Arc;

use guestmem::config::defaults;
use guestmem::{
    Attachment, Config, Error, GuestAddress, MockMemory, MockMemoryBuilder, MockProvider,
    ProcessInfo, TextEncoding,
};

const MODULE_BASE: u64 = 0x7FFA_1234_5000;
const GUEST_BASE: u64 = 0x7FFA_1000_0000 + defaults::OFFSET_64;

fn emulator() -> ProcessInfo {
    ProcessInfo {
        pid: 4242,
        name: "emulator.exe".to_string(),
        is_64_bit: true,
        main_module_base: MODULE_BASE,
    }
}

fn attach(builder: MockMemoryBuilder, config: Config) -> Attachment<MockProvider> {
    let memory = Arc::new(builder.build());
    let mut attachment = Attachment::new(MockProvider::new(emulator(), memory), config).unwrap();
    assert!(attachment.refresh());
    attachment
}

/// Lay strings out back to back from guest offset `start`, returning their guest addresses
fn pack_strings(
    mut builder: MockMemoryBuilder,
    start: u64,
    items: &[&str],
) -> (MockMemoryBuilder, Vec<GuestAddress>) {
    let mut cursor = start;
    let mut addresses = Vec::new();
    for item in items {
        builder = builder.string(GUEST_BASE + cursor, item);
        addresses.push(cursor as GuestAddress);
        cursor += item.len() as u64 + 1;
    }
    (builder, addresses)
}

#[test]
fn test_dictionary_over_song_table() {
    let titles = ["fly above", "Rising in the Sun", "A", "", "GAMBOL", "quell"];
    let (builder, addresses) = pack_strings(MockMemory::builder(GUEST_BASE), 0x2000, &titles);
    let attachment = attach(builder, Config::default());
    let session = attachment.session().unwrap();

    let mut table = addresses.clone();
    table.reverse();
    table.insert(2, 0);
    table.push(addresses[1]);

    let dict = session.build_string_dictionary(&table, 0).unwrap();
    assert_eq!(dict.len(), titles.len() + 1);
    assert_eq!(dict[&0], "");
    for (address, title) in addresses.iter().zip(titles) {
        assert_eq!(dict[address], title);
    }
    assert_eq!(attachment.provider().memory().read_count(), 2);
}

#[test]
fn test_guest_and_absolute_addresses_agree() {
    let (builder, addresses) =
        pack_strings(MockMemory::builder(GUEST_BASE), 0x100, &["left", "right"]);
    let attachment = attach(builder, Config::default());
    let session = attachment.session().unwrap();

    let absolute: Vec<GuestAddress> = addresses
        .iter()
        .map(|&a| (GUEST_BASE + a as u64) as GuestAddress)
        .collect();
    assert_eq!(
        session.resolve_pointer_strings(&addresses, 16).unwrap(),
        session.resolve_pointer_strings(&absolute, 16).unwrap()
    );
}

#[test]
fn test_shift_jis_dictionary_with_substring_offset() {
    let encoding = TextEncoding::for_label("shift_jis").unwrap();
    let first = encoding.encode_terminated("曲名:冥");
    let second = encoding.encode_terminated("曲名:灼熱");
    let builder = MockMemory::builder(GUEST_BASE)
        .bytes(GUEST_BASE + 0x40, &first)
        .bytes(GUEST_BASE + 0x40 + first.len() as u64, &second);
    let config = Config {
        encoding: "shift_jis".to_string(),
        ..Config::default()
    };
    let attachment = attach(builder, config);
    let session = attachment.session().unwrap();

    let second_address = 0x40 + first.len() as GuestAddress;
    let dict = session
        .build_string_dictionary(&[second_address, 0x40], 3)
        .unwrap();
    assert_eq!(dict[&0x40], "冥");
    assert_eq!(dict[&second_address], "灼熱");
}

#[test]
fn test_string_array_dictionary() {
    let encoding = TextEncoding::default();
    let builder = MockMemory::builder(GUEST_BASE)
        .bytes(GUEST_BASE + 0x10, &encoding.encode_array(&["NORMAL", "HYPER", "ANOTHER"]))
        .bytes(GUEST_BASE + 0x40, &encoding.encode_array::<&str>(&[]))
        .bytes(GUEST_BASE + 0x50, &encoding.encode_array(&["solo"]));
    let attachment = attach(builder, Config::default());
    let session = attachment.session().unwrap();

    let dict = session
        .build_string_array_dictionary(&[0x50, 0, 0x10, 0x40])
        .unwrap();
    let expected: HashMap<GuestAddress, Vec<String>> = HashMap::from([
        (0, vec![String::new()]),
        (0x10, vec!["NORMAL".into(), "HYPER".into(), "ANOTHER".into()]),
        (0x40, vec![String::new()]),
        (0x50, vec!["solo".into()]),
    ]);
    assert_eq!(dict, expected);
}

#[test]
fn test_long_tail_string_read_in_chunks() {
    let tail = "x".repeat(300);
    let (builder, addresses) =
        pack_strings(MockMemory::builder(GUEST_BASE), 0x800, &["head", tail.as_str()]);
    let attachment = attach(builder, Config::default());
    let session = attachment.session().unwrap();

    let strings = session.resolve_pointer_strings(&addresses, 16).unwrap();
    assert_eq!(strings, vec!["head".to_string(), tail]);
    // One bulk read plus ceil(301 / 64) dedicated reads
    assert_eq!(attachment.provider().memory().read_count(), 1 + 5);
}

#[test]
fn test_unreadable_table_reports_failure() {
    let attachment = attach(MockMemory::builder(GUEST_BASE).size(0x100), Config::default());
    let session = attachment.session().unwrap();

    let result = session.build_string_dictionary(&[0x10, 0x20_0000], 0);
    assert!(matches!(result, Err(Error::MemoryReadFailed { .. })));
}

#[test]
fn test_requests_fail_after_process_exit() {
    let (builder, addresses) = pack_strings(MockMemory::builder(GUEST_BASE), 0x10, &["a", "b"]);
    let mut attachment = attach(builder, Config::default());

    attachment.provider().memory().set_alive(false);
    attachment.provider().set_process(None);
    assert!(!attachment.refresh());
    assert!(matches!(attachment.session(), Err(Error::NotAttached)));

    attachment.provider().memory().set_alive(true);
    attachment.provider().set_process(Some(emulator()));
    assert!(attachment.refresh());
    let dict = attachment
        .session()
        .unwrap()
        .build_string_dictionary(&addresses, 0)
        .unwrap();
    assert_eq!(dict[&addresses[1]], "b");
}
