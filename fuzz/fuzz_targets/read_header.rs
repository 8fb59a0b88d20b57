#![no_main]
use libfuzzer_sys::fuzz_target;
use voxcorr::VolumeHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = VolumeHeader::from_reader(data) {
        let _ = header.dim.shape();
        let _ = header.dim.element_count();
        let _ = header.vox_offset();
        let _ = header.data_len();
    }
});
