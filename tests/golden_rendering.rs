use std::fs;
use std::path::PathBuf;

use linebench::job::render_with_seed;

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

#[test]
fn golden_frame_matches_fixture() {
    let width = 96u32;
    let height = 48u32;

    // The seed text makes the golden content-addressed
    let png = render_with_seed(width, height, b"linebench golden frame 1").expect("render");

    let expected_path = golden_path("frame1.png.hex");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, hex::encode(&png)).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    let exp = fs::read_to_string(&expected_path)
        .unwrap_or_else(|e| panic!("no golden at {:?} ({}); run with UPDATE_GOLDENS=1", expected_path, e));
    let exp_bytes = hex::decode(exp.trim()).expect("invalid hex in golden");
    assert_eq!(png, exp_bytes);
}

#[test]
fn seeded_frames_are_stable_and_seed_sensitive() {
    let a = render_with_seed(64, 64, b"alpha").unwrap();
    let b = render_with_seed(64, 64, b"alpha").unwrap();
    let c = render_with_seed(64, 64, b"beta").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn golden_fixture_decodes_to_the_seeded_frame_size() {
    let exp = fs::read_to_string(golden_path("frame1.png.hex")).expect("unable to read golden");
    let bytes = hex::decode(exp.trim()).expect("invalid hex in golden");
    let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    let reader = decoder.read_info().expect("png header");
    let info = reader.info();
    assert_eq!((info.width, info.height), (96, 48));
    assert_eq!(info.color_type, png::ColorType::Indexed);
    assert_eq!(info.palette.as_ref().map(|p| p.len()), Some(3 * 256));
}
