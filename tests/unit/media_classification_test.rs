// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use postharvest::infrastructure::media::classify_content_type;

#[test]
fn test_known_content_types() {
    let cases = [
        ("image/jpeg", ".jpg"),
        ("image/jpg", ".jpg"),
        ("image/png", ".png"),
        ("image/gif", ".gif"),
        ("image/webp", ".webp"),
        ("video/mp4", ".mp4"),
        ("video/webm", ".webm"),
        ("video/quicktime", ".mov"),
        ("application/pdf", ".pdf"),
    ];

    for (content_type, extension) in cases {
        assert_eq!(classify_content_type(content_type), extension, "{}", content_type);
    }
}

#[test]
fn test_parameters_and_case_are_ignored() {
    assert_eq!(classify_content_type("image/JPEG; charset=binary"), ".jpg");
    assert_eq!(classify_content_type(" Video/MP4 "), ".mp4");
    assert_eq!(classify_content_type("Image/PNG; charset=binary"), ".png");
}

#[test]
fn test_unknown_types_fall_back_to_subtype_or_bin() {
    assert_eq!(classify_content_type("image/avif"), ".avif");
    assert_eq!(classify_content_type("audio/ogg"), ".ogg");
    assert_eq!(classify_content_type("unknown/type"), ".type");
    assert_eq!(classify_content_type("garbage"), ".bin");
    assert_eq!(classify_content_type(""), ".bin");
}
