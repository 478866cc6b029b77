//! Project Entity
//!
//! Real-estate developments. `salesRate` is derived from the unit counters on
//! every write; the slug is derived from the name once, at creation.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::display::{format_area_range, format_price_range};
use crate::shared::query::PublicVisibility;
use crate::shared::slug::slugify;
use crate::shared::types::{to_rfc3339_opt, ImageAsset, NumberRange, SeoMeta};
use crate::shared::validation::{clean, clean_list, clean_opt, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Apartment,
    Villa,
    Townhouse,
    Land,
    Commercial,
    Resort,
    Office,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    UnderConstruction,
    Selling,
    Completed,
    SoldOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Location {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    fn cleaned(self) -> Self {
        Self {
            address: clean(self.address),
            district: clean_opt(self.district),
            city: clean(self.city),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    fn validate(&self, v: &mut Validation) {
        v.text("location.address", &self.address, 5, 300);
        v.text_opt("location.district", self.district.as_deref(), 100);
        v.text("location.city", &self.city, 2, 100);
        v.latitude("location.latitude", self.latitude);
        v.longitude("location.longitude", self.longitude);
    }
}

fn default_currency() -> String {
    "VND".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Unique, URL-safe
    pub slug: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    pub project_type: ProjectType,

    pub status: ProjectStatus,

    pub location: Location,

    pub price_range: PriceRange,

    pub area_range: NumberRange,

    #[serde(default)]
    pub total_units: u32,

    #[serde(default)]
    pub sold_units: u32,

    /// soldUnits / totalUnits * 100
    #[serde(default)]
    pub sales_rate: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,

    #[serde(default)]
    pub amenities: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<ImageAsset>,

    #[serde(default)]
    pub gallery: Vec<ImageAsset>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub completion_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub seo: SeoMeta,

    #[serde(default)]
    pub view_count: u64,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for Project {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isActive": true }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProjectInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
    pub short_description: Option<String>,
    pub project_type: ProjectType,
    pub status: Option<ProjectStatus>,
    pub location: Location,
    pub price_range: PriceRange,
    pub area_range: NumberRange,
    pub total_units: Option<u32>,
    pub sold_units: Option<u32>,
    pub developer: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub featured_image: Option<ImageAsset>,
    #[serde(default)]
    pub gallery: Vec<ImageAsset>,
    pub start_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub seo: Option<SeoMeta>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub project_type: Option<ProjectType>,
    pub status: Option<ProjectStatus>,
    pub location: Option<Location>,
    pub price_range: Option<PriceRange>,
    pub area_range: Option<NumberRange>,
    pub total_units: Option<u32>,
    pub sold_units: Option<u32>,
    pub developer: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub featured_image: Option<ImageAsset>,
    pub gallery: Option<Vec<ImageAsset>>,
    pub start_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub seo: Option<SeoMeta>,
}

/// Percentage of sold units; 0 when there are no units.
pub fn sales_rate(sold: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        sold as f64 / total as f64 * 100.0
    }
}

fn slug_or_derived(slug: Option<String>, name: &str) -> String {
    clean_opt(slug)
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| slugify(name))
}

impl Project {
    pub fn create(input: CreateProjectInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let name = clean(input.name);
        let mut project = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &name),
            name,
            description: clean(input.description),
            short_description: clean_opt(input.short_description),
            project_type: input.project_type,
            status: input.status.unwrap_or_default(),
            location: input.location.cleaned(),
            price_range: PriceRange {
                currency: clean(input.price_range.currency).to_uppercase(),
                ..input.price_range
            },
            area_range: input.area_range,
            total_units: input.total_units.unwrap_or(0),
            sold_units: input.sold_units.unwrap_or(0),
            sales_rate: 0.0,
            developer: clean_opt(input.developer),
            amenities: clean_list(input.amenities),
            featured_image: input.featured_image,
            gallery: input.gallery,
            start_date: input.start_date,
            completion_date: input.completion_date,
            is_featured: input.is_featured.unwrap_or(false),
            is_active: input.is_active.unwrap_or(true),
            seo: input.seo.map(SeoMeta::cleaned).unwrap_or_default(),
            view_count: 0,
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        project.validate()?;
        project.sales_rate = sales_rate(project.sold_units, project.total_units);
        Ok(project)
    }

    pub fn apply(&mut self, patch: UpdateProjectInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = clean(name);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(description) = patch.description {
            self.description = clean(description);
        }
        if let Some(short) = patch.short_description {
            self.short_description = clean_opt(Some(short));
        }
        if let Some(project_type) = patch.project_type {
            self.project_type = project_type;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(location) = patch.location {
            self.location = location.cleaned();
        }
        if let Some(price_range) = patch.price_range {
            self.price_range = PriceRange {
                currency: clean(price_range.currency).to_uppercase(),
                ..price_range
            };
        }
        if let Some(area_range) = patch.area_range {
            self.area_range = area_range;
        }
        if let Some(total) = patch.total_units {
            self.total_units = total;
        }
        if let Some(sold) = patch.sold_units {
            self.sold_units = sold;
        }
        if let Some(developer) = patch.developer {
            self.developer = clean_opt(Some(developer));
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = clean_list(amenities);
        }
        if let Some(image) = patch.featured_image {
            self.featured_image = Some(image);
        }
        if let Some(gallery) = patch.gallery {
            self.gallery = gallery;
        }
        if let Some(start) = patch.start_date {
            self.start_date = Some(start);
        }
        if let Some(completion) = patch.completion_date {
            self.completion_date = Some(completion);
        }
        if let Some(featured) = patch.is_featured {
            self.is_featured = featured;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(seo) = patch.seo {
            self.seo = seo.cleaned();
        }

        self.validate()?;
        self.sales_rate = sales_rate(self.sold_units, self.total_units);
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    pub fn add_images(&mut self, images: Vec<ImageAsset>, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        self.gallery.extend(images);
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    /// Drop a gallery image by blob id; returns whether one was removed.
    pub fn remove_image(&mut self, public_id: &str, actor: Option<&str>, now: DateTime<Utc>) -> bool {
        let before = self.gallery.len();
        self.gallery.retain(|image| image.public_id.as_deref() != Some(public_id));
        let removed = self.gallery.len() != before;
        if removed {
            self.updated_at = now;
            self.updated_by = actor.map(String::from).or(self.updated_by.take());
        }
        removed
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("name", &self.name, 3, 200);
        v.slug("slug", &self.slug);
        v.text("description", &self.description, 20, 20_000);
        v.text_opt("shortDescription", self.short_description.as_deref(), 500);
        self.location.validate(&mut v);

        v.at_least("priceRange.min", self.price_range.min, 0.0);
        v.at_least("priceRange.max", self.price_range.max, 0.0);
        v.min_max("priceRange", self.price_range.min, self.price_range.max);
        v.text("priceRange.currency", &self.price_range.currency, 3, 3);

        v.positive("areaRange.min", self.area_range.min);
        v.positive("areaRange.max", self.area_range.max);
        v.min_max("areaRange", self.area_range.min, self.area_range.max);

        v.within_total("soldUnits", self.sold_units as u64, self.total_units as u64);
        v.text_opt("developer", self.developer.as_deref(), 200);
        v.max_items("amenities", self.amenities.len(), 50);
        v.each_text("amenities", &self.amenities, 100);
        if let Some(image) = &self.featured_image {
            image.validate("featuredImage", &mut v);
        }
        v.max_items("gallery", self.gallery.len(), 100);
        for (i, image) in self.gallery.iter().enumerate() {
            image.validate(&format!("gallery[{}]", i), &mut v);
        }
        v.date_order("completionDate", self.start_date, self.completion_date);
        self.seo.validate(&mut v);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    pub location: Location,
    pub price_range: PriceRange,
    pub area_range: NumberRange,
    pub total_units: u32,
    pub sold_units: u32,
    pub sales_rate: f64,
    pub developer: Option<String>,
    pub amenities: Vec<String>,
    pub featured_image: Option<ImageAsset>,
    pub gallery: Vec<ImageAsset>,
    pub start_date: Option<String>,
    pub completion_date: Option<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub seo: SeoMeta,
    pub view_count: u64,
    /// e.g. "2,5 tỷ - 4 tỷ"
    pub price_display: String,
    /// e.g. "45 - 120 m²"
    pub area_display: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            price_display: format_price_range(p.price_range.min, p.price_range.max),
            area_display: format_area_range(p.area_range.min, p.area_range.max),
            id: p.id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            short_description: p.short_description,
            project_type: p.project_type,
            status: p.status,
            location: p.location,
            price_range: p.price_range,
            area_range: p.area_range,
            total_units: p.total_units,
            sold_units: p.sold_units,
            sales_rate: p.sales_rate,
            developer: p.developer,
            amenities: p.amenities,
            featured_image: p.featured_image,
            gallery: p.gallery,
            start_date: to_rfc3339_opt(p.start_date),
            completion_date: to_rfc3339_opt(p.completion_date),
            is_featured: p.is_featured,
            is_active: p.is_active,
            seo: p.seo,
            view_count: p.view_count,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn input(name: &str) -> CreateProjectInput {
        CreateProjectInput {
            name: name.to_string(),
            slug: None,
            description: "Khu căn hộ cao cấp ven sông với đầy đủ tiện ích".to_string(),
            short_description: None,
            project_type: ProjectType::Apartment,
            status: None,
            location: Location {
                address: "12 Bạch Đằng, Hải Châu".to_string(),
                district: Some("Hải Châu".to_string()),
                city: "Đà Nẵng".to_string(),
                latitude: Some(16.06),
                longitude: Some(108.22),
            },
            price_range: PriceRange { min: 2e9, max: 4e9, currency: "vnd".to_string() },
            area_range: NumberRange { min: 45.0, max: 120.0 },
            total_units: Some(50),
            sold_units: Some(0),
            developer: None,
            amenities: vec![],
            featured_image: None,
            gallery: vec![],
            start_date: None,
            completion_date: None,
            is_featured: None,
            is_active: None,
            seo: None,
        }
    }

    #[test]
    fn test_slug_derived_from_name() {
        let project = Project::create(input("Đà Nẵng Riverside"), None, Utc::now()).unwrap();
        assert_eq!(project.slug, "da-nang-riverside");
        assert_eq!(project.price_range.currency, "VND");
        assert_eq!(project.status, ProjectStatus::Planning);
        assert!(project.is_active);
    }

    #[test]
    fn test_sales_rate() {
        let mut project = Project::create(input("Sky Garden"), None, Utc::now()).unwrap();
        assert_eq!(project.sales_rate, 0.0);

        project
            .apply(UpdateProjectInput { sold_units: Some(25), ..Default::default() }, None, Utc::now())
            .unwrap();
        assert_eq!(project.sales_rate, 50.0);

        let result = project.apply(UpdateProjectInput { sold_units: Some(51), ..Default::default() }, None, Utc::now());
        assert!(result.is_err());
        assert_eq!(sales_rate(1, 0), 0.0);
    }

    #[test]
    fn test_range_boundaries() {
        let mut bad = input("Sky Garden");
        bad.price_range = PriceRange { min: 5e9, max: 4e9, currency: "VND".into() };
        assert!(Project::create(bad, None, Utc::now()).is_err());

        let mut equal = input("Sky Garden");
        equal.area_range = NumberRange { min: 80.0, max: 80.0 };
        assert!(Project::create(equal, None, Utc::now()).is_ok());

        let mut zero_area = input("Sky Garden");
        zero_area.area_range = NumberRange { min: 0.0, max: 80.0 };
        assert!(Project::create(zero_area, None, Utc::now()).is_err());
    }

    #[test]
    fn test_dates_and_coordinates() {
        let now = Utc::now();
        let mut p = input("Sky Garden");
        p.start_date = Some(now);
        p.completion_date = Some(now - Duration::days(1));
        assert!(Project::create(p, None, now).is_err());

        let mut p = input("Sky Garden");
        p.location.latitude = Some(95.0);
        assert!(Project::create(p, None, now).is_err());
    }

    #[test]
    fn test_gallery_removal() {
        let mut project = Project::create(input("Sky Garden"), None, Utc::now()).unwrap();
        project
            .add_images(
                vec![ImageAsset {
                    url: "https://cdn.example.vn/p/1.jpg".into(),
                    public_id: Some("p/1".into()),
                    caption: None,
                }],
                Some("U1"),
                Utc::now(),
            )
            .unwrap();
        assert!(!project.remove_image("p/2", None, Utc::now()));
        assert!(project.remove_image("p/1", None, Utc::now()));
        assert!(project.gallery.is_empty());
    }

    #[test]
    fn test_response_display_fields() {
        let project = Project::create(input("Sky Garden"), None, Utc::now()).unwrap();
        let response = ProjectResponse::from(project);
        assert_eq!(response.price_display, "2 tỷ - 4 tỷ");
        assert_eq!(response.area_display, "45 - 120 m²");
    }
}
