//! Fuzz target for SFTP reply parsing.
//!
//! Feeds arbitrary bytes to the reply decoder, which must return an error
//! rather than panic, over-read or allocate from an untrusted count.
//!
//! Run with:
//! ```bash
//! cd crates/proto
//! cargo +nightly fuzz run sftp_reply -- -max_total_time=300
//! ```

#![no_main]
use filexfer_proto::sftp::Reply;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Reply::from_bytes(data);

    // The same bytes without a length prefix
    if let Ok(reply) = Reply::from_payload(data) {
        // A decoded request id always comes from the payload
        if let Some(id) = reply.request_id() {
            assert_eq!(&data[1..5], &id.to_be_bytes());
        }
    }
});
