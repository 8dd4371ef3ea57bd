//! Full request lifecycle against the real codec: miss → render → hit →
//! source change → reap → clear → regenerate.

use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use vignette::config::ServiceConfig;
use vignette::imaging::{OutputFormat, RustCodec};
use vignette::key;
use vignette::serve::{ImageRequest, ImageService, Outcome, RequestOrigin, ServedImage};
use vignette::store::VariantStore;
use vignette::sweep::{MARKER_FILENAME, SweepGate, SweepOutcome};

fn write_jpeg(path: &Path, width: u32, height: u32, seed: u8) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, seed])
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    std::fs::write(path, buf.into_inner()).unwrap();
}

struct Site {
    tmp: TempDir,
    service: ImageService<RustCodec>,
}

impl Site {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        let config = ServiceConfig {
            source_root: tmp.path().join("images").to_string_lossy().into_owned(),
            cache_dir: tmp.path().join("cache").to_string_lossy().into_owned(),
            ..ServiceConfig::default()
        };
        let service = ImageService::new(config, RustCodec::new()).unwrap();
        Self { tmp, service }
    }

    fn source(&self, name: &str) -> std::path::PathBuf {
        self.tmp.path().join("images").join(name)
    }

    fn cache_dir(&self) -> std::path::PathBuf {
        self.tmp.path().join("cache")
    }

    fn get(&self, src: &str, width: Option<u32>, height: Option<u32>) -> ServedImage {
        let request = ImageRequest {
            src: src.to_string(),
            width,
            height,
            clear: false,
        };
        match self.service.handle(&request, RequestOrigin::default()).unwrap() {
            Outcome::Image(img) => img,
            other => panic!("expected image, got {other:?}"),
        }
    }
}

fn decoded_dims(served: &ServedImage) -> (u32, u32) {
    let img = image::load_from_memory(&served.bytes).unwrap();
    (img.width(), img.height())
}

#[test]
fn miss_renders_exact_fill_and_preserves_aspect() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 1600, 1200, 1);

    // Width only: height derived from 4:3 aspect
    let served = site.get("photo.jpg", Some(400), None);
    assert_eq!(decoded_dims(&served), (400, 300));
    assert_eq!(served.content_type, "image/webp");

    // Explicit box: filled exactly even though aspect differs
    let square = site.get("photo.jpg", Some(400), Some(400));
    assert_eq!(decoded_dims(&square), (400, 400));
}

#[test]
fn variant_file_lands_under_derived_key() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);
    site.get("photo.jpg", Some(200), None);

    let digest = key::hash_file(&site.source("photo.jpg")).unwrap();
    let expected = site.cache_dir().join(format!("photo-200-{digest}.webp"));
    assert!(expected.is_file());
}

#[test]
fn second_request_served_from_cache() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);

    let first = site.get("photo.jpg", Some(200), None);

    let digest = key::hash_file(&site.source("photo.jpg")).unwrap();
    let variant = site.cache_dir().join(format!("photo-200-{digest}.webp"));
    let mtime_before = std::fs::metadata(&variant).unwrap().modified().unwrap();

    let second = site.get("photo.jpg", Some(200), None);
    let mtime_after = std::fs::metadata(&variant).unwrap().modified().unwrap();

    // Same bytes, file untouched: the second request never re-rendered
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(mtime_before, mtime_after);
}

#[test]
fn editing_the_source_reaps_the_old_variant() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);
    site.get("photo.jpg", Some(200), None);
    let old_digest = key::hash_file(&site.source("photo.jpg")).unwrap();
    let old_variant = site.cache_dir().join(format!("photo-200-{old_digest}.webp"));
    assert!(old_variant.is_file());

    // Re-export the source with different pixels
    write_jpeg(&site.source("photo.jpg"), 800, 600, 99);
    site.get("photo.jpg", Some(200), None);

    let new_digest = key::hash_file(&site.source("photo.jpg")).unwrap();
    assert_ne!(old_digest, new_digest);
    assert!(!old_variant.exists());
    assert!(site
        .cache_dir()
        .join(format!("photo-200-{new_digest}.webp"))
        .is_file());
}

#[test]
fn other_sizes_survive_a_reap() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);
    site.get("photo.jpg", Some(200), None);
    site.get("photo.jpg", Some(400), None);

    write_jpeg(&site.source("photo.jpg"), 800, 600, 99);
    site.get("photo.jpg", Some(200), None);

    // The stale 400px variant of the old bytes is untouched until requested
    let old_digest_files: Vec<_> = std::fs::read_dir(site.cache_dir())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("photo-400-"))
        .collect();
    assert_eq!(old_digest_files.len(), 1);
}

#[test]
fn force_clear_then_request_regenerates() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);
    site.get("photo.jpg", Some(200), None);

    let cleared = site.service.force_clear().unwrap();
    assert!(cleared >= 1);

    let digest = key::hash_file(&site.source("photo.jpg")).unwrap();
    let variant = site.cache_dir().join(format!("photo-200-{digest}.webp"));
    assert!(!variant.exists());

    let served = site.get("photo.jpg", Some(200), None);
    assert_eq!(decoded_dims(&served), (200, 150));
    assert!(variant.is_file());
}

#[test]
fn expired_marker_triggers_sweep_on_next_check() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);
    site.get("photo.jpg", Some(200), None);

    // 31-day-old marker with a 30-day interval
    let stale_ts = chrono::Utc::now().timestamp() - 31 * 86_400;
    std::fs::write(
        site.cache_dir().join(MARKER_FILENAME),
        stale_ts.to_string(),
    )
    .unwrap();

    let gate = SweepGate::new(VariantStore::new(site.cache_dir()));
    let outcome = gate.maybe_sweep(true, 30).unwrap();
    assert!(matches!(outcome, SweepOutcome::Swept { deleted } if deleted >= 1));

    // Marker rewritten; cache empty apart from it
    let remaining: Vec<_> = std::fs::read_dir(site.cache_dir())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec![MARKER_FILENAME.to_string()]);
}

#[test]
fn png_source_to_png_output_keeps_alpha() {
    let site = Site::new();
    let img = image::RgbaImage::from_fn(64, 64, |x, _| {
        image::Rgba([120, 40, 200, if x < 8 { 0 } else { 255 }])
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    std::fs::write(site.source("badge.png"), buf.into_inner()).unwrap();

    // Reconfigure for png output
    let config = ServiceConfig {
        source_root: site.tmp.path().join("images").to_string_lossy().into_owned(),
        cache_dir: site.tmp.path().join("cache-png").to_string_lossy().into_owned(),
        output_format: "png".to_string(),
        ..ServiceConfig::default()
    };
    let service = ImageService::new(config, RustCodec::new()).unwrap();
    let request = ImageRequest {
        src: "badge.png".to_string(),
        width: Some(32),
        height: Some(32),
        clear: false,
    };
    let Outcome::Image(served) = service.handle(&request, RequestOrigin::default()).unwrap()
    else {
        panic!("expected image");
    };

    assert_eq!(served.content_type, "image/png");
    let decoded = image::load_from_memory(&served.bytes).unwrap();
    assert!(decoded.color().has_alpha());
}

#[test]
fn non_image_source_is_rejected() {
    let site = Site::new();
    std::fs::write(site.source("fake.jpg"), b"definitely not an image").unwrap();

    let request = ImageRequest {
        src: "fake.jpg".to_string(),
        width: Some(100),
        height: None,
        clear: false,
    };
    let result = site.service.handle(&request, RequestOrigin::default());
    assert!(result.is_err());
}

#[test]
fn clear_via_request_flag() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 800, 600, 1);
    site.get("photo.jpg", Some(200), None);

    let request = ImageRequest {
        src: String::new(),
        width: None,
        height: None,
        clear: true,
    };
    let Outcome::Cleared { deleted } =
        site.service.handle(&request, RequestOrigin::default()).unwrap()
    else {
        panic!("expected Cleared");
    };
    assert!(deleted >= 1);
}

#[test]
fn output_format_follows_config() {
    let site = Site::new();
    write_jpeg(&site.source("photo.jpg"), 400, 300, 1);

    let config = ServiceConfig {
        source_root: site.tmp.path().join("images").to_string_lossy().into_owned(),
        cache_dir: site.tmp.path().join("cache-jpg").to_string_lossy().into_owned(),
        output_format: "jpg".to_string(),
        ..ServiceConfig::default()
    };
    let service = ImageService::new(config, RustCodec::new()).unwrap();
    let request = ImageRequest {
        src: "photo.jpg".to_string(),
        width: Some(100),
        height: None,
        clear: false,
    };
    let Outcome::Image(served) = service.handle(&request, RequestOrigin::default()).unwrap()
    else {
        panic!("expected image");
    };

    assert_eq!(served.content_type, "image/jpeg");
    assert!(site
        .tmp
        .path()
        .join("cache-jpg")
        .read_dir()
        .unwrap()
        .flatten()
        .any(|e| e.file_name().to_string_lossy().ends_with(".jpg")));

    // Sanity: OutputFormat agrees with what the store derived
    assert_eq!(OutputFormat::Jpg.mime(), "image/jpeg");
}
