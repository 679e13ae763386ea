use std::io::Cursor;

use super::*;

fn info(codec: Option<&str>, pix_fmt: Option<&str>) -> VideoSourceInfo {
    VideoSourceInfo {
        width: 64,
        height: 48,
        fps_num: 30,
        fps_den: 1,
        pix_fmt: pix_fmt.map(str::to_string),
        codec_name: codec.map(str::to_string),
        has_audio: true,
        duration_sec: Some(1.0),
    }
}

#[test]
fn known_containers_map_to_extensions() {
    assert_eq!(container_for_mime("video/mp4").unwrap().ext, "mp4");
    assert_eq!(container_for_mime("video/quicktime").unwrap().ext, "mov");
    assert_eq!(container_for_mime("video/webm").unwrap().ext, "webm");
    assert_eq!(container_for_mime("video/x-matroska").unwrap().ext, "mkv");
    assert!(container_for_mime("video/x-msvideo").is_none());
}

#[test]
fn plan_keeps_source_codec_and_pix_fmt() {
    let mp4 = container_for_mime("video/mp4").unwrap();
    let plan = plan_encode(&mp4, &info(Some("hevc"), Some("yuv420p10le")));
    assert_eq!(plan.encoder, "libx265");
    assert_eq!(plan.pix_fmt, "yuv420p10le");
}

#[test]
fn plan_falls_back_for_codecs_the_container_cannot_carry() {
    let webm = container_for_mime("video/webm").unwrap();
    let plan = plan_encode(&webm, &info(Some("h264"), Some("yuv444p")));
    assert_eq!(plan.encoder, "libvpx-vp9");
    assert_eq!(plan.pix_fmt, "yuv420p");

    let mp4 = container_for_mime("video/mp4").unwrap();
    let plan = plan_encode(&mp4, &info(Some("mpeg4"), None));
    assert_eq!(plan.encoder, "libx264");
}

#[test]
fn read_frame_distinguishes_eof_from_truncation() {
    let mut buf = [0u8; 4];

    let mut two_frames = Cursor::new(vec![1u8; 8]);
    assert!(read_frame(&mut two_frames, &mut buf).unwrap());
    assert!(read_frame(&mut two_frames, &mut buf).unwrap());
    assert!(!read_frame(&mut two_frames, &mut buf).unwrap());

    let mut truncated = Cursor::new(vec![1u8; 6]);
    assert!(read_frame(&mut truncated, &mut buf).unwrap());
    let err = read_frame(&mut truncated, &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn unsupported_container_is_a_decode_failure() {
    let input = EncodedMedia::new(vec![0u8; 16], "video/x-msvideo");
    let err = watermark_video(&input, &CancelToken::new(), 1.0, |_, _| {
        unreachable!("overlay must not be built")
    })
    .unwrap_err();
    assert!(matches!(err, WatermarkError::Decode(_)));
}
