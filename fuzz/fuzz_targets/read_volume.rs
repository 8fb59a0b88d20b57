#![no_main]
use libfuzzer_sys::fuzz_target;
use voxcorr::volume::read_volume_from;

fuzz_target!(|data: &[u8]| {
    if let Ok((header, volume)) = read_volume_from(data) {
        assert_eq!(volume.shape(), &header.dim.shape()[..]);
    }
});
