//! Cross-codec tests: both codecs must agree on the RGBA8 layout.

use clconv_io::{create_codec, CodecKind, RgbaImage};

fn gradient(width: u32, height: u32) -> RgbaImage {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 77, 255]);
        }
    }
    RgbaImage::from_raw(width, height, data).unwrap()
}

#[test]
fn test_native_write_third_party_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");
    let image = gradient(17, 9);

    create_codec(CodecKind::Native).save(&path, &image).unwrap();
    let loaded = create_codec(CodecKind::ThirdParty).load(&path).unwrap();

    assert_eq!(loaded, image);
}

#[test]
fn test_third_party_write_native_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");
    let image = gradient(5, 3);

    create_codec(CodecKind::ThirdParty).save(&path, &image).unwrap();
    let loaded = create_codec(CodecKind::Native).load(&path).unwrap();

    assert_eq!(loaded, image);
}

#[test]
fn test_third_party_bmp_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.bmp");
    let image = gradient(4, 4);

    let codec = create_codec(CodecKind::ThirdParty);
    codec.save(&path, &image).unwrap();
    let loaded = codec.load(&path).unwrap();

    assert_eq!(loaded.dimensions(), (4, 4));
}
