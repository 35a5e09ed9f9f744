//! Fuzz target for SFTP attribute decoding.
//!
//! Run with:
//! ```bash
//! cd crates/proto
//! cargo +nightly fuzz run sftp_attrs -- -max_total_time=300
//! ```

#![no_main]
use filexfer_proto::sftp::FileAttributes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((attrs, consumed)) = FileAttributes::from_bytes(data) {
        assert!(consumed <= data.len());

        // Whatever decodes must survive re-encoding
        let encoded = attrs.to_bytes();
        let (reparsed, _) =
            FileAttributes::from_bytes(&encoded).expect("re-encoded attributes should decode");
        assert_eq!(attrs, reparsed);
    }
});
