//! Fuzz target for opening arbitrary bytes with every filter.
//!
//! Each filter that identifies the input is opened and both forks are read
//! back with a few seeks. Errors are expected; panics and hangs are not.
//!
//! Run with: cargo +nightly fuzz run filter_open

#![no_main]

use std::io::{Read, Seek, SeekFrom};

use libfuzzer_sys::fuzz_target;

fn drain(stream: Option<Box<dyn forkfilter::ReadSeek>>) {
    let Some(mut stream) = stream else {
        return;
    };
    let mut buf = [0u8; 4096];
    let mut total = 0usize;
    // cap the work for inputs claiming huge decoded sizes
    while total < 1 << 20 {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => total += n,
        }
    }
    let _ = stream.seek(SeekFrom::Start(0));
    let _ = stream.seek(SeekFrom::End(-1));
    let _ = stream.read(&mut buf[..1]);
}

fuzz_target!(|data: &[u8]| {
    for mut filter in forkfilter::Filters::new().all() {
        if !filter.identify_bytes(data) {
            continue;
        }
        if filter.open_bytes(data.to_vec()).is_err() {
            continue;
        }
        let _ = filter.data_fork_len();
        let _ = filter.resource_fork_len();
        if let Ok(stream) = filter.data_fork_stream() {
            drain(stream);
        }
        if let Ok(stream) = filter.resource_fork_stream() {
            drain(stream);
        }
        filter.close();
    }
});
