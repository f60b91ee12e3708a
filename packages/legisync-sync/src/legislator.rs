//! Legislator service: get, list and create legislators

use legisync_storage::{Model, WriteOperation};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::store::InterceptedStore;

/// Two-letter postal code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Al, Ak, Az, Ar, Ca, Co, Ct, De, Fl, Ga,
    Hi, Id, Il, In, Ia, Ks, Ky, La, Me, Md,
    Ma, Mi, Mn, Ms, Mo, Mt, Ne, Nv, Nh, Nj,
    Nm, Ny, Nc, Nd, Oh, Ok, Or, Pa, Ri, Sc,
    Sd, Tn, Tx, Ut, Vt, Va, Wa, Wv, Wi, Wy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Party {
    Democrat,
    Republican,
    Independent,
    Libertarian,
    Green,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Chamber {
    House,
    Senate,
}

/// Input for creating a legislator (camelCase on the wire)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLegislator {
    pub first_name: String,
    pub last_name: String,
    pub state: State,
    pub party: Party,
    pub chamber: Chamber,
    pub district: i64,
    pub chamber_website_url: String,
    pub capitol_website_url: String,
}

impl NewLegislator {
    /// Decode raw request input; unknown enum values and missing fields are `InvalidInput`
    pub fn from_json(input: serde_json::Value) -> Result<Self> {
        serde_json::from_value(input).map_err(SyncError::invalid_input)
    }

    fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() {
            return Err(SyncError::invalid_input("firstName must not be empty"));
        }
        if self.last_name.trim().is_empty() {
            return Err(SyncError::invalid_input("lastName must not be empty"));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct LegislatorService {
    store: InterceptedStore,
}

impl LegislatorService {
    pub fn new(store: InterceptedStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .store
            .execute(WriteOperation::find_unique(Model::Legislator, id.into()))
            .await?;

        Ok(Some(result.value).filter(|v| !v.is_null()))
    }

    pub async fn get_all(&self) -> Result<Vec<serde_json::Value>> {
        let result = self
            .store
            .execute(WriteOperation::find_many(Model::Legislator))
            .await?;

        match result.value {
            serde_json::Value::Array(items) => Ok(items),
            other => Err(SyncError::parse(format!(
                "findMany returned a non-array value: {}",
                other
            ))),
        }
    }

    /// Create from untyped request input; nothing is written if it does not decode
    pub async fn create_from_json(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        self.create(NewLegislator::from_json(input)?).await
    }

    /// Create a legislator. Indexing happens in the interceptor.
    pub async fn create(&self, input: NewLegislator) -> Result<serde_json::Value> {
        input.validate()?;

        let data = serde_json::to_value(&input)?;
        let result = self
            .store
            .execute(WriteOperation::create(Model::Legislator, data))
            .await?;
        Ok(result.value)
    }
}
