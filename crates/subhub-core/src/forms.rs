//! Minimal validation for the two submission forms.

use serde::{Deserialize, Serialize};

use crate::amount::{AmountError, TokenAmount};
use crate::model::{Address, Plan};
use crate::videos::extract_video_id;

pub const MAX_PLAN_DURATION_DAYS: u64 = 3_650;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Give your plan a name.")]
    MissingName,
    #[error("Enter a valid price: {0}")]
    InvalidPrice(AmountError),
    #[error("Price must be greater than zero.")]
    ZeroPrice,
    #[error(
        "Duration must be a whole number of days between 1 and {}.",
        MAX_PLAN_DURATION_DAYS
    )]
    InvalidDuration,
    #[error("Give your video a title.")]
    MissingTitle,
    #[error("Enter a YouTube link (youtu.be or youtube.com).")]
    InvalidVideoUrl,
    #[error("Select a tier for this video.")]
    MissingTier,
    #[error("The selected tier does not exist or is no longer active.")]
    UnknownTier,
    #[error("You can only publish to your own tier.")]
    NotTierOwner,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlanForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub duration_days: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPlanForm {
    pub name: String,
    pub description: String,
    pub price: TokenAmount,
    pub duration_days: u64,
}

impl CreatePlanForm {
    pub fn validate(&self, decimals: u8) -> Result<ValidPlanForm, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingName);
        }
        let price = TokenAmount::parse_units(&self.price, decimals).map_err(FormError::InvalidPrice)?;
        if price.is_zero() {
            return Err(FormError::ZeroPrice);
        }
        let duration_days = self
            .duration_days
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|days| (1..=MAX_PLAN_DURATION_DAYS).contains(days))
            .ok_or(FormError::InvalidDuration)?;

        Ok(ValidPlanForm {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            price,
            duration_days,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishVideoForm {
    pub title: String,
    pub url: String,
    /// Tier selection; the creator address of the target plan.
    #[serde(default)]
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidVideoForm {
    pub title: String,
    pub video_ref: String,
    pub plan: Address,
}

impl PublishVideoForm {
    /// `plans` is the current active plan list; `publisher` the connected account.
    pub fn validate(&self, plans: &[Plan], publisher: &Address) -> Result<ValidVideoForm, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::MissingTitle);
        }
        let video_ref = extract_video_id(&self.url).ok_or(FormError::InvalidVideoUrl)?;
        if self.plan.trim().is_empty() {
            return Err(FormError::MissingTier);
        }
        let plan = Address::parse(&self.plan).map_err(|_| FormError::UnknownTier)?;
        let Some(target) = plans.iter().find(|candidate| candidate.creator == plan && candidate.active)
        else {
            return Err(FormError::UnknownTier);
        };
        if &target.creator != publisher {
            return Err(FormError::NotTierOwner);
        }

        Ok(ValidVideoForm {
            title: title.to_string(),
            video_ref,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CreatePlanForm, FormError, PublishVideoForm};
    use crate::amount::{AmountError, TokenAmount};
    use crate::model::{Address, Plan};

    fn plan(creator: &Address) -> Plan {
        Plan {
            creator: creator.clone(),
            name: "Tier".to_string(),
            description: String::new(),
            price: TokenAmount::from_base_units(1),
            duration_seconds: 86_400,
            active: true,
            subscriber_count: 0,
        }
    }

    #[test]
    fn create_plan_form_validates_each_field() {
        let valid = CreatePlanForm {
            name: " Gold ".to_string(),
            description: String::new(),
            price: "12.50".to_string(),
            duration_days: "30".to_string(),
        };
        let parsed = valid.validate(2);
        assert_eq!(
            parsed.map(|form| (form.name, form.price, form.duration_days)),
            Ok(("Gold".to_string(), TokenAmount::from_base_units(1250), 30))
        );

        let mut form = valid.clone();
        form.name = "  ".to_string();
        assert_eq!(form.validate(2), Err(FormError::MissingName));

        let mut form = valid.clone();
        form.price = "0".to_string();
        assert_eq!(form.validate(2), Err(FormError::ZeroPrice));

        let mut form = valid.clone();
        form.price = "abc".to_string();
        assert_eq!(
            form.validate(2),
            Err(FormError::InvalidPrice(AmountError::Invalid))
        );

        let mut form = valid;
        form.duration_days = "0".to_string();
        assert_eq!(form.validate(2), Err(FormError::InvalidDuration));
    }

    #[test]
    fn publish_form_requires_tier_selection() -> Result<(), Box<dyn std::error::Error>> {
        let me = Address::parse("0x4444444444444444444444444444444444444444")?;
        let other = Address::parse("0x5555555555555555555555555555555555555555")?;
        let plans = vec![plan(&me), plan(&other)];

        let mut form = PublishVideoForm {
            title: "Episode 1".to_string(),
            url: "https://youtu.be/abc12345678".to_string(),
            plan: String::new(),
        };
        assert_eq!(form.validate(&plans, &me), Err(FormError::MissingTier));

        form.plan = other.to_string();
        assert_eq!(form.validate(&plans, &me), Err(FormError::NotTierOwner));

        form.plan = "0x6666666666666666666666666666666666666666".to_string();
        assert_eq!(form.validate(&plans, &me), Err(FormError::UnknownTier));

        form.plan = me.to_string();
        let valid = form.validate(&plans, &me)?;
        assert_eq!(valid.video_ref, "abc12345678");
        assert_eq!(valid.plan, me);

        form.url = "https://example.com/video".to_string();
        assert_eq!(form.validate(&plans, &me), Err(FormError::InvalidVideoUrl));
        Ok(())
    }
}
