// Property Tests for blockstore
// Round-trip and byte-range properties over arbitrary payloads

use blockstore::{create, AnyBlockStore, BlockStore, DataKind, Error, Hash256, Options};
use proptest::prelude::*;
use tempfile::TempDir;

fn kind_strategy() -> impl Strategy<Value = DataKind> {
    prop_oneof![
        Just(DataKind::Block),
        Just(DataKind::MerkleBlock),
        Just(DataKind::Undo),
        Just(DataKind::Filter),
    ]
}

/// Payloads valid for `kind`: block and merkle block payloads carry an
/// 80-byte header.
fn payload_strategy(kind: DataKind) -> impl Strategy<Value = Vec<u8>> {
    let min = if kind.is_hashed() { 0 } else { 80 };
    prop::collection::vec(any::<u8>(), min..600)
}

fn open(options: Options) -> AnyBlockStore {
    let mut store = create(options).unwrap();
    store.ensure().unwrap();
    store.open().unwrap();
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever is written comes back byte for byte, on both backends
    #[test]
    fn prop_roundtrip(
        (kind, payloads) in kind_strategy().prop_flat_map(|kind| {
            (Just(kind), prop::collection::vec(payload_strategy(kind), 1..12))
        }),
    ) {
        let dir = TempDir::new().unwrap();
        let stores = [
            open(Options::new(dir.path()).max_file_length(2048)),
            open(Options::default().memory(true)),
        ];

        for store in &stores {
            for (i, data) in payloads.iter().enumerate() {
                let hash = Hash256([i as u8; 32]);
                prop_assert!(store.write(kind, &hash, data).unwrap());
            }
            for (i, data) in payloads.iter().enumerate() {
                let hash = Hash256([i as u8; 32]);
                let stored = store.read(kind, &hash, None, None).unwrap();
                prop_assert_eq!(stored.as_ref(), Some(data));
            }
        }
    }

    /// A range read equals the matching slice, and overruns are rejected
    #[test]
    fn prop_offset_length(
        data in prop::collection::vec(any::<u8>(), 0..400),
        offset in 0u32..450,
        length in 0u32..450,
    ) {
        let dir = TempDir::new().unwrap();
        let stores = [open(Options::new(dir.path())), open(Options::default().memory(true))];
        let hash = Hash256([0xAB; 32]);
        let size = data.len() as u32;

        for store in &stores {
            store.write(DataKind::Undo, &hash, &data).unwrap();
            let result = store.read(DataKind::Undo, &hash, Some(offset), Some(length));

            if offset as u64 + length as u64 <= size as u64 {
                let (start, end) = (offset as usize, (offset + length) as usize);
                prop_assert_eq!(result.unwrap(), Some(data[start..end].to_vec()));
            } else {
                let out_of_bounds = matches!(result, Err(Error::OutOfBounds { .. }));
                prop_assert!(out_of_bounds);
            }

            let tail = store.read(DataKind::Undo, &hash, Some(offset), None);
            if offset <= size {
                prop_assert_eq!(tail.unwrap(), Some(data[offset as usize..].to_vec()));
            } else {
                let out_of_bounds = matches!(tail, Err(Error::OutOfBounds { .. }));
                prop_assert!(out_of_bounds);
            }
        }
    }
}
