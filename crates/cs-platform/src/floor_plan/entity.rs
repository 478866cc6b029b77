//! Floor Plan Entity

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::display::{format_price_short, format_vnd};
use crate::shared::query::PublicVisibility;
use crate::shared::types::ImageAsset;
use crate::shared::validation::{clean, clean_opt, Validation};
use crate::{Result, TsidGenerator};

/// A unit layout belonging to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlan {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning project
    pub project_id: String,

    pub name: String,

    pub bedrooms: u32,

    pub bathrooms: u32,

    /// Square metres
    pub area: f64,

    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAsset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub is_active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for FloorPlan {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isActive": true }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateFloorPlanInput {
    pub project_id: String,
    pub name: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: f64,
    pub price: f64,
    pub image: Option<ImageAsset>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateFloorPlanInput {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area: Option<f64>,
    pub price: Option<f64>,
    pub image: Option<ImageAsset>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl FloorPlan {
    pub fn create(input: CreateFloorPlanInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let plan = Self {
            id: TsidGenerator::generate(),
            project_id: clean(input.project_id).to_uppercase(),
            name: clean(input.name),
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            area: input.area,
            price: input.price,
            image: input.image,
            description: clean_opt(input.description),
            sort_order: input.sort_order.unwrap_or(0),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn apply(&mut self, patch: UpdateFloorPlanInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(project_id) = patch.project_id {
            self.project_id = clean(project_id).to_uppercase();
        }
        if let Some(name) = patch.name {
            self.name = clean(name);
        }
        if let Some(bedrooms) = patch.bedrooms {
            self.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = patch.bathrooms {
            self.bathrooms = bathrooms;
        }
        if let Some(area) = patch.area {
            self.area = area;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(order) = patch.sort_order {
            self.sort_order = order;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        if !TsidGenerator::is_valid(&self.project_id) {
            v.record("projectId", "must be a valid id");
        }
        v.text("name", &self.name, 2, 100);
        v.range("bedrooms", self.bedrooms as f64, 0.0, 20.0);
        v.range("bathrooms", self.bathrooms as f64, 0.0, 20.0);
        v.positive("area", self.area);
        v.at_least("price", self.price, 0.0);
        if let Some(image) = &self.image {
            image.validate("image", &mut v);
        }
        v.text_opt("description", self.description.as_deref(), 2000);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlanResponse {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: f64,
    pub price: f64,
    pub image: Option<ImageAsset>,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub price_display: String,
    pub price_short: String,
    /// VND per square metre, rounded
    pub price_per_square_metre: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FloorPlan> for FloorPlanResponse {
    fn from(f: FloorPlan) -> Self {
        Self {
            price_display: format_vnd(f.price),
            price_short: format_price_short(f.price),
            price_per_square_metre: (f.area > 0.0).then(|| (f.price / f.area).round()),
            id: f.id,
            project_id: f.project_id,
            name: f.name,
            bedrooms: f.bedrooms,
            bathrooms: f.bathrooms,
            area: f.area,
            price: f.price,
            image: f.image,
            description: f.description,
            sort_order: f.sort_order,
            is_active: f.is_active,
            created_at: f.created_at.to_rfc3339(),
            updated_at: f.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateFloorPlanInput {
        CreateFloorPlanInput {
            project_id: TsidGenerator::generate(),
            name: "Căn 2PN".to_string(),
            bedrooms: 2,
            bathrooms: 2,
            area: 72.5,
            price: 3_200_000_000.0,
            image: None,
            description: None,
            sort_order: None,
            is_active: None,
        }
    }

    #[test]
    fn test_create() {
        let plan = FloorPlan::create(input(), Some("U1"), Utc::now()).unwrap();
        assert!(plan.is_active);
        let response = FloorPlanResponse::from(plan);
        assert_eq!(response.price_short, "3,2 tỷ");
    }

    #[test]
    fn test_rules() {
        let mut i = input();
        i.bedrooms = 21;
        assert!(FloorPlan::create(i, None, Utc::now()).is_err());

        let mut i = input();
        i.area = 0.0;
        assert!(FloorPlan::create(i, None, Utc::now()).is_err());

        let mut i = input();
        i.project_id = "nope".to_string();
        assert!(FloorPlan::create(i, None, Utc::now()).is_err());
    }
}
