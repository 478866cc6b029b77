//! Banner Entity
//!
//! Promotional images placed in fixed slots of the site. A banner is shown
//! while active and inside its optional start/end window.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::query::{to_bson_datetime, PublicVisibility};
use crate::shared::types::{to_rfc3339_opt, ImageAsset};
use crate::shared::validation::{clean, clean_opt, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BannerPosition {
    #[default]
    HomeHero,
    HomeMiddle,
    Sidebar,
    ProjectPage,
    ProductPage,
    NewsPage,
    Popup,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    #[default]
    SameTab,
    NewTab,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    pub image: ImageAsset,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_image: Option<ImageAsset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,

    pub link_target: LinkTarget,

    pub position: BannerPosition,

    #[serde(default)]
    pub sort_order: i32,

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
    pub end_date: Option<DateTime<Utc>>,

    pub is_active: bool,

    #[serde(default)]
    pub click_count: u64,

    #[serde(default)]
    pub impression_count: u64,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for Banner {
    fn public_filter(now: DateTime<Utc>) -> Document {
        let now = to_bson_datetime(now);
        doc! {
            "isActive": true,
            "$and": [
                { "$or": [ { "startDate": Bson::Null }, { "startDate": { "$lte": now } } ] },
                { "$or": [ { "endDate": Bson::Null }, { "endDate": { "$gte": now } } ] },
            ],
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image: ImageAsset,
    pub mobile_image: Option<ImageAsset>,
    pub link_url: Option<String>,
    pub link_target: Option<LinkTarget>,
    pub position: Option<BannerPosition>,
    pub sort_order: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBannerInput {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image: Option<ImageAsset>,
    pub mobile_image: Option<ImageAsset>,
    pub link_url: Option<String>,
    pub link_target: Option<LinkTarget>,
    pub position: Option<BannerPosition>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

/// Click-through rate in percent, unrounded; 0 without impressions.
pub fn click_through_rate(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    clicks as f64 * 100.0 / impressions as f64
}

impl Banner {
    pub fn create(input: CreateBannerInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let banner = Self {
            id: TsidGenerator::generate(),
            title: clean(input.title),
            subtitle: clean_opt(input.subtitle),
            image: input.image,
            mobile_image: input.mobile_image,
            link_url: clean_opt(input.link_url),
            link_target: input.link_target.unwrap_or_default(),
            position: input.position.unwrap_or_default(),
            sort_order: input.sort_order.unwrap_or(0),
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: input.is_active.unwrap_or(true),
            click_count: 0,
            impression_count: 0,
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        banner.validate()?;
        Ok(banner)
    }

    pub fn apply(&mut self, patch: UpdateBannerInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = clean(title);
        }
        if let Some(subtitle) = patch.subtitle {
            self.subtitle = clean_opt(Some(subtitle));
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(mobile) = patch.mobile_image {
            self.mobile_image = Some(mobile);
        }
        if let Some(link) = patch.link_url {
            self.link_url = clean_opt(Some(link));
        }
        if let Some(target) = patch.link_target {
            self.link_target = target;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(order) = patch.sort_order {
            self.sort_order = order;
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    pub fn ctr(&self) -> f64 {
        click_through_rate(self.click_count, self.impression_count)
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date.map_or(true, |start| start <= now)
            && self.end_date.map_or(true, |end| end >= now)
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("title", &self.title, 2, 200);
        v.text_opt("subtitle", self.subtitle.as_deref(), 300);
        self.image.validate("image", &mut v);
        if let Some(mobile) = &self.mobile_image {
            mobile.validate("mobileImage", &mut v);
        }
        v.url("linkUrl", self.link_url.as_deref());
        v.date_order("endDate", self.start_date, self.end_date);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerResponse {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: ImageAsset,
    pub mobile_image: Option<ImageAsset>,
    pub link_url: Option<String>,
    pub link_target: LinkTarget,
    pub position: BannerPosition,
    pub sort_order: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: bool,
    pub click_count: u64,
    pub impression_count: u64,
    pub ctr: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Banner> for BannerResponse {
    fn from(b: Banner) -> Self {
        Self {
            ctr: b.ctr(),
            id: b.id,
            title: b.title,
            subtitle: b.subtitle,
            image: b.image,
            mobile_image: b.mobile_image,
            link_url: b.link_url,
            link_target: b.link_target,
            position: b.position,
            sort_order: b.sort_order,
            start_date: to_rfc3339_opt(b.start_date),
            end_date: to_rfc3339_opt(b.end_date),
            is_active: b.is_active,
            click_count: b.click_count,
            impression_count: b.impression_count,
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> CreateBannerInput {
        CreateBannerInput {
            title: "Mở bán đợt 1".to_string(),
            subtitle: None,
            image: ImageAsset {
                url: "https://cdn.example.com/banner.jpg".to_string(),
                public_id: Some("banners/banner".to_string()),
                caption: None,
            },
            mobile_image: None,
            link_url: Some("/projects/sunrise".to_string()),
            link_target: None,
            position: None,
            sort_order: None,
            start_date: None,
            end_date: None,
            is_active: None,
        }
    }

    #[test]
    fn test_create_defaults() {
        let banner = Banner::create(input(), Some("U1"), Utc::now()).unwrap();
        assert_eq!(banner.position, BannerPosition::HomeHero);
        assert_eq!(banner.link_target, LinkTarget::SameTab);
        assert!(banner.is_active);
        assert_eq!(banner.ctr(), 0.0);
    }

    #[test]
    fn test_window_order() {
        let now = Utc::now();
        let mut bad = input();
        bad.start_date = Some(now);
        bad.end_date = Some(now);
        assert!(Banner::create(bad, None, now).is_err());
    }

    #[test]
    fn test_visibility_window() {
        let now = Utc::now();
        let mut windowed = input();
        windowed.start_date = Some(now + Duration::days(1));
        windowed.end_date = Some(now + Duration::days(7));
        let banner = Banner::create(windowed, None, now).unwrap();
        assert!(!banner.is_visible(now));
        assert!(banner.is_visible(now + Duration::days(2)));
        assert!(!banner.is_visible(now + Duration::days(8)));
    }

    #[test]
    fn test_ctr() {
        assert_eq!(click_through_rate(0, 0), 0.0);
        assert_eq!(click_through_rate(10, 100), 10.0);
        assert_eq!(click_through_rate(5, 200), 2.5);
        assert!((click_through_rate(1, 3) - 100.0 / 3.0).abs() < 1e-12);
        assert!(click_through_rate(1, 3) > 33.33);
    }

    #[test]
    fn test_clear_window() {
        let now = Utc::now();
        let mut windowed = input();
        windowed.end_date = Some(now + Duration::days(7));
        let mut banner = Banner::create(windowed, None, now).unwrap();
        let patch: UpdateBannerInput = serde_json::from_str(r#"{"endDate":null}"#).unwrap();
        banner.apply(patch, None, now).unwrap();
        assert!(banner.end_date.is_none());
    }

    #[test]
    fn test_public_filter_checks_both_bounds() {
        let filter = Banner::public_filter(Utc::now());
        assert!(filter.get_bool("isActive").unwrap());
        assert_eq!(filter.get_array("$and").unwrap().len(), 2);
    }
}
