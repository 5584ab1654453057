//! Read-only stores for pricing tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{Category, DataType, PricingRule, Setting, SettingScope, SettingValue};
use crate::resolution::{ScopeResolver, SpecificityWeights};
use crate::store::{RuleStore, SettingStore};

#[derive(Default)]
pub(crate) struct StaticStore {
    pub settings: Vec<Setting>,
    pub rules: Vec<PricingRule>,
}

impl SettingStore for StaticStore {
    fn effective_settings(&self, keys: &[String], at: DateTime<Utc>) -> EngineResult<Vec<Setting>> {
        Ok(self
            .settings
            .iter()
            .filter(|s| keys.contains(&s.key) && s.is_effective_at(at))
            .cloned()
            .collect())
    }

    fn find_setting(&self, id: Uuid) -> EngineResult<Option<Setting>> {
        Ok(self.settings.iter().find(|s| s.id == id).cloned())
    }

    fn all_settings(&self) -> EngineResult<Vec<Setting>> {
        Ok(self.settings.clone())
    }

    fn find_category(&self, _name: &str) -> EngineResult<Option<Category>> {
        Ok(None)
    }

    fn categories(&self) -> EngineResult<Vec<Category>> {
        Ok(Vec::new())
    }

    fn keys_in_category(&self, _category_id: Uuid) -> EngineResult<Vec<String>> {
        Ok(Vec::new())
    }
}

impl RuleStore for StaticStore {
    fn live_rules(&self, at: DateTime<Utc>) -> EngineResult<Vec<PricingRule>> {
        Ok(self.rules.iter().filter(|r| r.is_live_at(at)).cloned().collect())
    }

    fn find_rule(&self, id: Uuid) -> EngineResult<Option<PricingRule>> {
        Ok(self.rules.iter().find(|r| r.id == id).cloned())
    }

    fn all_rules(&self) -> EngineResult<Vec<PricingRule>> {
        Ok(self.rules.clone())
    }
}

pub(crate) fn number(key: &str, value: &str, scope: SettingScope) -> Setting {
    let created = Utc::now() - Duration::minutes(5);
    Setting {
        id: Uuid::new_v4(),
        key: key.to_string(),
        value: SettingValue::Number(Decimal::from_str(value).unwrap()),
        data_type: DataType::Number,
        category_id: None,
        description: None,
        scope,
        priority: 0,
        effective_date: created,
        expiry_date: None,
        active: true,
        version: 1,
        created_by: "admin".to_string(),
        updated_by: "admin".to_string(),
        created_at: created,
        updated_at: created,
    }
}

pub(crate) fn resolver(store: &Arc<StaticStore>) -> ScopeResolver {
    ScopeResolver::new(store.clone(), SpecificityWeights::default())
}
