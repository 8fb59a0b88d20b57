#![no_main]
use libfuzzer_sys::fuzz_target;
use voxcorr::volume::StreamedVolume;

fuzz_target!(|data: &[u8]| {
    if let Ok(volume) = StreamedVolume::from_reader(data) {
        for slice in volume {
            if slice.is_err() {
                break;
            }
        }
    }
});
