use super::*;

#[test]
fn normalize_id_slash_normalization() {
    assert_eq!(normalize_texture_id("red_concrete").unwrap(), "red_concrete");
    assert_eq!(normalize_texture_id("blocks\\stone").unwrap(), "blocks/stone");
    assert_eq!(normalize_texture_id("./a//b").unwrap(), "a/b");
    assert!(normalize_texture_id("../secret").is_err());
    assert!(normalize_texture_id("/etc/passwd").is_err());
    assert!(normalize_texture_id("  ").is_err());
    assert!(normalize_texture_id("./.").is_err());
}

#[test]
fn texture_path_appends_extension_under_root() {
    let layout = AssetLayout::new("textures");
    assert_eq!(
        layout.texture_path("lime_wool").unwrap(),
        PathBuf::from("textures").join("lime_wool.png")
    );
    assert_eq!(
        layout.background_path().unwrap(),
        PathBuf::from("textures").join("white_concrete.png")
    );

    let bare = AssetLayout {
        extension: String::new(),
        ..AssetLayout::default()
    };
    assert_eq!(
        bare.texture_path("x.webp").unwrap(),
        PathBuf::from("assets").join("x.webp")
    );
}
