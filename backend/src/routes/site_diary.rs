//! Inputs of the `siteDiary` and `weather` routers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{required, required_id, InputResult, Validate};
use crate::api::{ProjectId, SiteDiaryId};
use crate::models::WeatherCondition;

pub const CREATE_SITE_DIARY: &str = "siteDiary.createSiteDiary";
pub const GET_SITE_DIARIES: &str = "siteDiary.getSiteDiaries";
pub const GET_SITE_DIARY: &str = "siteDiary.getSiteDiary";
pub const UPDATE_SITE_DIARY: &str = "siteDiary.updateSiteDiary";
pub const DELETE_SITE_DIARY: &str = "siteDiary.deleteSiteDiary";

pub const UPDATE_SITE_DIARY_WEATHER: &str = "weather.updateSiteDiaryWeather";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteDiaryInput {
    pub project_id: ProjectId,
    pub site_diary_name: String,
    pub site_diary_date: DateTime<Utc>,
}

impl Validate for CreateSiteDiaryInput {
    fn validate(mut self) -> InputResult<Self> {
        required_id(self.project_id.as_str(), "projectId", "A projectId is required")?;
        required(
            &mut self.site_diary_name,
            "siteDiaryName",
            "A site diary name is required",
        )?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDiaryIdInput {
    pub site_diary_id: SiteDiaryId,
}

impl Validate for SiteDiaryIdInput {
    fn validate(self) -> InputResult<Self> {
        required_id(
            self.site_diary_id.as_str(),
            "siteDiaryId",
            "A siteDiaryId is required",
        )?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteDiaryInput {
    pub site_diary_id: SiteDiaryId,
    pub site_diary_name: String,
    pub site_diary_date: DateTime<Utc>,
}

impl Validate for UpdateSiteDiaryInput {
    fn validate(mut self) -> InputResult<Self> {
        required(
            &mut self.site_diary_name,
            "siteDiaryName",
            "A site diary name is required",
        )?;
        required_id(
            self.site_diary_id.as_str(),
            "siteDiaryId",
            "A siteDiaryId is required",
        )?;
        Ok(self)
    }
}

/// Full replacement of a diary's weather row; absent parts are cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteDiaryWeatherInput {
    pub site_diary_id: SiteDiaryId,
    #[serde(default)]
    pub morning: Option<WeatherCondition>,
    #[serde(default)]
    pub afternoon: Option<WeatherCondition>,
    #[serde(default)]
    pub evening: Option<WeatherCondition>,
}

impl Validate for UpdateSiteDiaryWeatherInput {
    fn validate(self) -> InputResult<Self> {
        required_id(
            self.site_diary_id.as_str(),
            "siteDiaryId",
            "A siteDiaryId is required",
        )?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diary_date_is_rfc3339() {
        let input: CreateSiteDiaryInput = serde_json::from_value(json!({
            "projectId": "p1",
            "siteDiaryName": "Day 14",
            "siteDiaryDate": "2024-03-05T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(input.site_diary_date.to_rfc3339(), "2024-03-05T00:00:00+00:00");
    }

    #[test]
    fn test_weather_parts_are_optional() {
        let input: UpdateSiteDiaryWeatherInput = serde_json::from_value(json!({
            "siteDiaryId": "d1",
            "afternoon": "RAINY"
        }))
        .unwrap();
        assert_eq!(input.morning, None);
        assert_eq!(input.afternoon, Some(WeatherCondition::Rainy));
    }
}
