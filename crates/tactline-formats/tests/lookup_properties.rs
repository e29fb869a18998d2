#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Lookup properties of the encoding table and archive index
//!
//! Tables built from arbitrary key sets must answer every present key with
//! the value it was built from and never report a key that was not added.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeMap;
use tactline_formats::{
    ArchiveIndex, ArchiveIndexBuilder, ArchiveSpan, ContentKey, EncodingKey, EncodingTable,
    EncodingTableBuilder,
};

fn key_bytes() -> impl Strategy<Value = [u8; 16]> {
    prop::array::uniform16(any::<u8>())
}

fn content_records() -> impl Strategy<Value = BTreeMap<[u8; 16], (u64, Vec<[u8; 16]>)>> {
    prop::collection::btree_map(
        key_bytes(),
        (
            0u64..=0xFF_FFFF_FFFF,
            prop::collection::vec(key_bytes(), 1..4),
        ),
        0..300,
    )
}

fn archive_records() -> impl Strategy<Value = BTreeMap<[u8; 16], (u64, u32)>> {
    prop::collection::btree_map(key_bytes(), (0u64..u64::from(u32::MAX), any::<u32>()), 0..500)
}

proptest! {
    #[test]
    fn encoding_lookup_matches_inserted(
        records in content_records(),
        queries in prop::collection::vec(key_bytes(), 0..20)
    ) {
        let mut builder = EncodingTableBuilder::new().with_page_size_kb(1);
        for (ckey, (size, ekeys)) in &records {
            builder.add_content(
                ContentKey::from_bytes(*ckey),
                *size,
                ekeys.iter().copied().map(EncodingKey::from_bytes),
            );
        }
        let data = builder.build().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let table = EncodingTable::parse(&data).map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(!table.is_degraded());
        prop_assert_eq!(table.ckey_entry_count(), records.len());

        for (ckey, (size, ekeys)) in &records {
            let ckey = ContentKey::from_bytes(*ckey);
            let found: Vec<[u8; 16]> = table
                .lookup(&ckey)
                .unwrap_or_default()
                .iter()
                .map(|k| *k.as_bytes())
                .collect();
            prop_assert_eq!(&found, ekeys);
            prop_assert_eq!(table.decoded_size(&ckey), Some(*size));
            prop_assert_eq!(
                table.canonical_ekey(&ckey),
                Some(EncodingKey::from_bytes(ekeys[0]))
            );
        }

        for query in queries.iter().filter(|p| !records.contains_key(*p)) {
            prop_assert!(table.lookup(&ContentKey::from_bytes(*query)).is_none());
        }
    }

    #[test]
    fn archive_lookup_never_invents_keys(
        records in archive_records(),
        queries in prop::collection::vec(key_bytes(), 0..20)
    ) {
        let mut builder = ArchiveIndexBuilder::new();
        for (key, (offset, length)) in &records {
            builder.add_entry(EncodingKey::from_bytes(*key), *offset, *length);
        }
        let data = builder.build().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let index = ArchiveIndex::parse(&data).map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(index.len(), records.len());
        for (key, (offset, length)) in &records {
            prop_assert_eq!(
                index.lookup(&EncodingKey::from_bytes(*key)),
                Some(ArchiveSpan { offset: *offset, length: *length })
            );
        }
        for query in queries.iter().filter(|p| !records.contains_key(*p)) {
            prop_assert_eq!(index.lookup(&EncodingKey::from_bytes(*query)), None);
        }
    }
}
