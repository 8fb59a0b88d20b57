//! An application for reading volume file meta-data.

extern crate voxcorr;

use std::env;
use voxcorr::VolumeHeader;

fn main() {
    let mut args = env::args().skip(1);
    let filename = args.next().expect("Path to volume file is required");
    let header = VolumeHeader::from_file(filename).expect("Failed to read volume file");
    println!("{:#?}", &header);
    println!("shape: {:?}", header.dim.shape());
}
