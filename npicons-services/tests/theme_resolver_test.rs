use image::{Rgba, RgbaImage};
use npicons_services::icon::{
    IconCache, IconDescriptor, IconError, IconLookup, ThemeResolver, XdgThemeResolver,
};
use npicons_services::settings::CacheSettings;
use npicons_services::tasks::ManualScheduler;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

fn assert_shade(data: &[u8], shade: u8) {
    assert!(data[0].abs_diff(shade) <= 1, "expected shade {}, got {}", shade, data[0]);
    assert_eq!(data[3], 255);
}

fn write_png(path: &Path, size: u32, shade: u8) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(size, size, Rgba([shade, shade, shade, 255]))
        .save(path)
        .unwrap();
}

/// Builds a fixture with a `Test` theme inheriting `Parent`, an unrelated
/// `Other` theme, hicolor and a standalone pixmap.
fn fixture(name: &str) -> PathBuf {
    let base = std::env::temp_dir().join("npicons_theme_test").join(name);
    if base.exists() {
        fs::remove_dir_all(&base).unwrap();
    }

    fs::create_dir_all(base.join("Test")).unwrap();
    fs::write(
        base.join("Test/index.theme"),
        "[Icon Theme]\nName=Test\nInherits=Parent\nDirectories=16x16/apps,48x48/apps\n\n\
         [16x16/apps]\nSize=16\nType=Fixed\n\n[48x48/apps]\nSize=48\nType=Fixed\n",
    )
    .unwrap();
    write_png(&base.join("Test/16x16/apps/app.png"), 16, 10);
    write_png(&base.join("Test/48x48/apps/app.png"), 48, 20);

    fs::create_dir_all(base.join("Parent")).unwrap();
    fs::write(
        base.join("Parent/index.theme"),
        "[Icon Theme]\nName=Parent\nDirectories=32x32/apps\n\n[32x32/apps]\nSize=32\nType=Fixed\n",
    )
    .unwrap();
    write_png(&base.join("Parent/32x32/apps/inherited.png"), 32, 30);

    fs::create_dir_all(base.join("hicolor")).unwrap();
    fs::write(
        base.join("hicolor/index.theme"),
        "[Icon Theme]\nName=Hicolor\nDirectories=48x48/apps\n\n[48x48/apps]\nSize=48\nType=Threshold\n",
    )
    .unwrap();
    write_png(&base.join("hicolor/48x48/apps/application-x-generic.png"), 48, 40);

    fs::create_dir_all(base.join("Other")).unwrap();
    fs::write(
        base.join("Other/index.theme"),
        "[Icon Theme]\nName=Other\nDirectories=16x16/apps\n\n[16x16/apps]\nSize=16\nType=Fixed\n",
    )
    .unwrap();
    write_png(&base.join("Other/16x16/apps/app.png"), 16, 60);

    write_png(&base.join("pixmap.png"), 24, 50);
    base
}

#[test]
fn test_lookup_prefers_matching_directory() {
    let base = fixture("matching");
    let lookup = IconLookup::with_search_paths(vec![base.clone()]);
    assert_eq!(lookup.search_paths(), &[base.clone()]);

    assert_eq!(
        lookup.lookup_icon("app", 16, 1, "Test"),
        Some(base.join("Test/16x16/apps/app.png"))
    );
    assert_eq!(
        lookup.lookup_icon("app", 24, 2, "Test"),
        Some(base.join("Test/48x48/apps/app.png"))
    );
}

#[test]
fn test_lookup_follows_inheritance_and_standalone() {
    let base = fixture("inheritance");
    let lookup = IconLookup::with_search_paths(vec![base.clone()]);

    assert_eq!(
        lookup.lookup_icon("inherited", 16, 1, "Test"),
        Some(base.join("Parent/32x32/apps/inherited.png"))
    );
    assert_eq!(
        lookup.lookup_icon("application-x-generic", 16, 1, "Test"),
        Some(base.join("hicolor/48x48/apps/application-x-generic.png"))
    );
    assert_eq!(
        lookup.lookup_icon("pixmap", 16, 1, "Test"),
        Some(base.join("pixmap.png"))
    );
    assert_eq!(lookup.lookup_icon("nothing", 16, 1, "Test"), None);
}

#[test]
fn test_unknown_theme_is_reported() {
    let base = fixture("unknown");
    let lookup = IconLookup::with_search_paths(vec![base]);
    assert!(matches!(
        lookup.load_theme("NoSuchTheme"),
        Err(IconError::ThemeNotFound(_))
    ));
}

#[test]
fn test_resolver_renders_at_physical_size() {
    let base = fixture("resolver");
    let resolver = XdgThemeResolver::with_search_paths("Test", vec![base]);

    let image = resolver.resolve("app", 16, 2).unwrap();
    assert_eq!((image.width(), image.height()), (32, 32));
    assert_shade(image.data(), 20);

    assert!(matches!(
        resolver.resolve("nothing", 16, 1),
        Err(IconError::IconNotFound(_))
    ));
}

#[test]
fn test_cache_falls_back_through_real_theme() {
    let base = fixture("cache");
    let mut settings = CacheSettings::default();
    settings.theme_name = "Test".to_string();
    settings.search_paths = vec![base.clone()];

    let cache = IconCache::builder(settings)
        .scheduler(Rc::new(ManualScheduler::new()))
        .build();

    let found = cache.lookup(&IconDescriptor::name("app"), 16, 1);
    assert!(!found.is_fallback());

    let icon = cache.get_named_icon("nothing", 16, 1);
    assert_eq!(icon.width(), 16);
    assert_shade(icon.data(), 40);

    let pixmap = cache.get_icon(&IconDescriptor::file(base.join("pixmap.png")), 24, 1);
    assert_eq!(&pixmap.data()[..4], &[50, 50, 50, 255]);
}

fn cache_in(base: &Path, theme: &str) -> IconCache {
    let mut settings = CacheSettings::default();
    settings.theme_name = theme.to_string();
    settings.search_paths = vec![base.to_path_buf()];
    IconCache::builder(settings)
        .scheduler(Rc::new(ManualScheduler::new()))
        .build()
}

#[test]
fn test_set_theme_switches_and_clears() {
    let base = fixture("switch");
    let cache = cache_in(&base, "Test");

    let before = cache.get_named_icon("app", 16, 1);
    assert_shade(before.data(), 10);

    cache.set_theme("Other").unwrap();
    assert!(cache.is_empty());
    assert_shade(before.data(), 10);

    let after = cache.get_named_icon("app", 16, 1);
    assert_shade(after.data(), 60);

    cache.set_theme("Test").unwrap();
    assert_shade(cache.get_named_icon("app", 16, 1).data(), 10);
}

#[test]
fn test_set_theme_to_unknown_keeps_cache() {
    let base = fixture("switch_unknown");
    let cache = cache_in(&base, "Test");
    cache.lookup(&IconDescriptor::name("app"), 16, 1);

    assert!(matches!(
        cache.set_theme("NoSuchTheme"),
        Err(IconError::ThemeNotFound(_))
    ));
    assert_eq!(cache.len(), 1);
    assert_shade(cache.get_named_icon("app", 16, 1).data(), 10);
}

#[test]
fn test_theme_change_rereads_index() {
    let base = fixture("reread");
    let resolver = XdgThemeResolver::with_search_paths("Test", vec![base.clone()]);
    assert_shade(resolver.resolve("app", 16, 1).unwrap().data(), 10);

    // Drop the 16px directory; the parsed index is still cached.
    fs::write(
        base.join("Test/index.theme"),
        "[Icon Theme]\nName=Test\nInherits=Parent\nDirectories=48x48/apps\n\n\
         [48x48/apps]\nSize=48\nType=Fixed\n",
    )
    .unwrap();
    assert_shade(resolver.resolve("app", 16, 1).unwrap().data(), 10);

    resolver.theme_changed("Test").unwrap();
    assert_eq!(resolver.theme(), "Test");
    assert_shade(resolver.resolve("app", 16, 1).unwrap().data(), 20);

    resolver.theme_changed("Other").unwrap();
    assert_eq!(resolver.theme(), "Other");
    assert!(resolver.theme_changed("NoSuchTheme").is_err());
    assert_eq!(resolver.theme(), "Other");
}
