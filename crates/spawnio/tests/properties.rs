//! Per-stream independence of resolution across arbitrary request mixes.
#![cfg(unix)]

use std::collections::HashSet;
use std::fs::File;
use std::os::fd::{AsFd, AsRawFd};

use proptest::prelude::*;
use spawnio::resolve::{StreamSpec, resolve};
use spawnio::sys::{HandlePlatform, PosixPlatform};
use spawnio_common::{Stream, StreamArg};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Inherit,
    Pipe,
    Null,
    UseHandle,
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::Inherit),
        Just(Kind::Pipe),
        Just(Kind::Null),
        Just(Kind::UseHandle),
    ]
}

fn spec(kind: Kind, file: &File) -> StreamSpec<'_> {
    match kind {
        Kind::Inherit => StreamSpec::Inherit,
        Kind::Pipe => StreamSpec::Pipe,
        Kind::Null => StreamSpec::Null,
        Kind::UseHandle => StreamSpec::UseHandle(file.as_fd()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_child_slot_is_fresh_and_inheritable(kinds in [kind(), kind(), kind()]) {
        let platform = PosixPlatform::new();
        let file = tempfile::tempfile().unwrap();

        let resolved = resolve(
            spec(kinds[0], &file),
            spec(kinds[1], &file),
            spec(kinds[2], &file),
            &platform,
        )
        .unwrap();

        let mut seen = HashSet::new();
        for (stream, kind) in Stream::ALL.into_iter().zip(kinds) {
            let entry = resolved.stream(stream);

            let Some(raw) = entry.handle() else {
                // Only an inherited stream the parent lacks can be empty.
                prop_assert!(matches!(kind, Kind::Inherit));
                continue;
            };
            prop_assert!(raw > 2);
            prop_assert_ne!(raw, file.as_raw_fd());
            prop_assert!(seen.insert(raw));

            let handle = resolved.child_handle(stream).unwrap();
            prop_assert!(platform.is_inheritable(handle).unwrap());

            let parent = resolved.parent_pipes().get(stream);
            prop_assert_eq!(parent.is_some(), matches!(kind, Kind::Pipe));
            if let Some(parent) = parent {
                prop_assert!(!platform.is_inheritable(parent).unwrap());
                prop_assert!(seen.insert(parent.as_raw_fd()));
            }

            if matches!(kind, Kind::UseHandle) {
                prop_assert_eq!(
                    entry.requested(),
                    StreamArg::Raw(i64::from(file.as_raw_fd()))
                );
            }
        }

        let child_count = resolved.child_handles().iter().flatten().count();
        prop_assert_eq!(resolved.to_close().len(), child_count);
        prop_assert!(!platform.is_inheritable(file.as_fd()).unwrap());
    }
}
