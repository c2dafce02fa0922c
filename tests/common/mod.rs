#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use image::{ImageFormat, Rgb, RgbImage};

use outfit_match::{
    db::InMemoryCatalog,
    error::{AppError, AppResult},
    models::CatalogItem,
    services::{images::ImageFetcher, providers::ModelClient, MatchPipeline, MatchSettings},
};

pub const PHOTO_REF: &str = "/uploads/look.jpg";

/// Model that replays fixed answers; `None` simulates an outage
#[derive(Default)]
pub struct ScriptedModel {
    pub text_reply: Option<String>,
    pub vision_replies: Vec<String>,
    pub text_calls: AtomicUsize,
    pub vision_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_text(reply: &str) -> Self {
        Self {
            text_reply: Some(reply.to_string()),
            ..Default::default()
        }
    }

    pub fn with_vision(mut self, replies: &[&str]) -> Self {
        self.vision_replies = replies.iter().map(|r| r.to_string()).collect();
        self
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedModel {
    async fn text_complete(&self, _prompt: &str) -> AppResult<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text_reply
            .clone()
            .ok_or_else(|| AppError::ModelUnavailable("scripted outage".to_string()))
    }

    async fn vision_complete(&self, _prompt: &str, _images: &[Vec<u8>]) -> AppResult<String> {
        let call = self.vision_calls.fetch_add(1, Ordering::SeqCst);
        // The first vision call belongs to intent resolution when a photo is
        // present, so scripted replies are indexed by call order.
        self.vision_replies
            .get(call)
            .cloned()
            .ok_or_else(|| AppError::ModelUnavailable("scripted outage".to_string()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Serves generated PNGs for known refs and records every fetch
#[derive(Default)]
pub struct FakeImages {
    pub images: HashMap<String, Vec<u8>>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn with_refs(refs: &[&str]) -> Self {
        let mut images = HashMap::new();
        for (i, r) in refs.iter().enumerate() {
            images.insert(r.to_string(), png((i * 20 % 255) as u8));
        }
        Self {
            images,
            ..Default::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_requested(&self, image_ref: &str) -> bool {
        self.requested
            .lock()
            .expect("fetch log poisoned")
            .iter()
            .any(|r| r == image_ref)
    }
}

#[async_trait::async_trait]
impl ImageFetcher for FakeImages {
    async fn fetch(&self, image_ref: &str) -> AppResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .expect("fetch log poisoned")
            .push(image_ref.to_string());
        self.images
            .get(image_ref)
            .cloned()
            .ok_or_else(|| AppError::ImageFetchFailure(image_ref.to_string()))
    }
}

pub fn png(shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(3, 3, Rgb([shade, 255 - shade, 128]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("encode test png");
    buffer.into_inner()
}

pub fn item(id: i64, name: &str, category: &str) -> CatalogItem {
    CatalogItem {
        id,
        name: name.to_string(),
        price: format!("{} ₽", id * 100),
        description: String::new(),
        url: Some(format!("https://shop.example/item/{}", id)),
        image_url: Some(format!("img-{}", id)),
        image_blob: None,
        category: category.to_string(),
    }
}

/// A catalog spanning the whole taxonomy plus an off-taxonomy category
pub fn sample_catalog() -> Vec<CatalogItem> {
    let mut items = Vec::new();
    let mut id = 1;
    for (category, name, count) in [
        ("Футболки и топы женские", "Футболка", 12),
        ("Юбки женские", "Юбка", 4),
        ("Блузы и рубашки женские", "Блуза", 1),
        ("Брюки, бриджи и капри женские", "Брюки", 3),
        ("Пиджаки, жакеты и жилеты женские", "Жакет", 2),
        ("Платья женские", "Платье", 2),
    ] {
        for n in 0..count {
            items.push(item(id, &format!("{} {}", name, n + 1), category));
            id += 1;
        }
    }
    items
}

pub fn image_refs(items: &[CatalogItem]) -> Vec<String> {
    items.iter().filter_map(|i| i.image_ref()).collect()
}

/// Fetcher knowing the user photo and every catalog image
pub fn images_for(items: &[CatalogItem]) -> FakeImages {
    let refs = image_refs(items);
    let mut all: Vec<&str> = vec![PHOTO_REF];
    all.extend(refs.iter().map(String::as_str));
    FakeImages::with_refs(&all)
}

pub fn pipeline(
    items: Vec<CatalogItem>,
    model: Arc<ScriptedModel>,
    images: Arc<FakeImages>,
) -> MatchPipeline {
    MatchPipeline::new(
        Arc::new(InMemoryCatalog::new(items)),
        model,
        images,
        MatchSettings::default(),
    )
}
