use std::{fs, path::PathBuf};

use vol2heightfield::{
    ScanParams, Volume, error::HeightFieldError, extract_height_field,
    vol::{read_vol, write_vol},
};

fn scratch_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vol2heightfield-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn volume_survives_a_trip_through_disk() {
    let volume = Volume::from_fn(7, 5, 3, |x, y, z| (x * 31 + y * 7 + z) as u8);
    let path = scratch_path("trip.vol");
    write_vol(&path, &volume).unwrap();
    assert_eq!(read_vol(&path).unwrap(), volume);
}

#[test]
fn missing_input_is_an_io_error() {
    let path = scratch_path("does-not-exist.vol");
    assert!(matches!(read_vol(&path), Err(HeightFieldError::Io(_))));
}

#[test]
fn height_field_is_written_as_pgm() {
    let volume = Volume::from_fn(8, 8, 8, |_, y, z| if z == 3 && y < 4 { 200u8 } else { 0 });
    let vol_path = scratch_path("steps.vol");
    write_vol(&vol_path, &volume).unwrap();

    let params = ScanParams::default()
        .with_origin([4, 4, 0])
        .with_size(8, 6)
        .with_max_scan(8);
    let outcome = extract_height_field::<u8, u8>(&read_vol(&vol_path).unwrap(), params).unwrap();

    let pgm_path = scratch_path("steps.pgm");
    outcome.field.save(&pgm_path).unwrap();

    let image = image::open(&pgm_path).unwrap().to_luma8();
    assert_eq!(image.dimensions(), (8, 6));
    // Row v samples y = v + 1; rows up to y = 3 hit the plateau at depth 3.
    assert_eq!(image.get_pixel(0, 0).0, [5]);
    assert_eq!(image.get_pixel(7, 2).0, [5]);
    assert_eq!(image.get_pixel(3, 3).0, [0]);
    assert_eq!(image.get_pixel(3, 5).0, [0]);
}
