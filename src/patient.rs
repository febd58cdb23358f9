//! Patient records as stored in the `patients` collection, and the
//! projected neighbor documents returned by a similarity search.

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Top-level field holding the member match payload
pub const MEMBER_FIELD: &str = "incomingMemberMatchValue";
/// Field path the vector index is built over
pub const EMBEDDING_PATH: &str = "incomingMemberMatchValue.identityEmbedding";
/// Field path of the text the embedding is computed from
pub const IDENTITY_TEXT_PATH: &str = "incomingMemberMatchValue.identityText";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "_id")]
    pub id: Bson,

    #[serde(rename = "incomingMemberMatchValue", default)]
    pub member: MemberMatchValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMatchValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<Bson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<Bson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Bson>,

    #[serde(rename = "memberGroupID", default, skip_serializing_if = "Option::is_none")]
    pub member_group_id: Option<Bson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_embedding: Option<Vec<f32>>,
}

impl PatientRecord {
    pub fn has_embedding(&self) -> bool {
        self.member.identity_embedding.is_some()
    }

    /// The stored embedding, or an error naming the record if it is
    /// missing, empty or all zeros.
    pub fn embedding(&self) -> Result<&[f32], MatchError> {
        match self.member.identity_embedding.as_deref() {
            Some([]) => Err(self.malformed("identityEmbedding is empty")),
            Some(vector) if vector.iter().all(|x| *x == 0.0) => {
                Err(self.malformed("identityEmbedding is a zero vector"))
            }
            Some(vector) => Ok(vector),
            None => Err(self.malformed("identityEmbedding is missing")),
        }
    }

    pub fn malformed(&self, reason: impl Into<String>) -> MatchError {
        MatchError::MalformedRecord { id: display_id(&self.id), reason: reason.into() }
    }

    /// Project the record the way the search pipeline's `$project` stage does
    pub fn to_neighbor(&self, score: f64) -> Neighbor {
        Neighbor {
            id: self.id.clone(),
            score,
            first_name: self.member.first_name.clone(),
            last_name: self.member.last_name.clone(),
            birth_date: self.member.birth_date.clone(),
            member_group_id: self.member.member_group_id.clone(),
        }
    }
}

/// One search hit: the record id, its similarity score and the four
/// demographic fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    #[serde(rename = "_id")]
    pub id: Bson,

    pub score: f64,

    #[serde(rename = "firstName", default)]
    pub first_name: Option<Bson>,

    #[serde(rename = "lastName", default)]
    pub last_name: Option<Bson>,

    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<Bson>,

    #[serde(rename = "memberGroupID", default)]
    pub member_group_id: Option<Bson>,
}

/// A record waiting for its identity text to be embedded
#[derive(Debug, Clone, PartialEq)]
pub struct PendingIdentity {
    pub id: Bson,
    pub text: String,
}

/// Render an id without the quoting `Bson`'s `Display` adds to strings
pub fn display_id(id: &Bson) -> String {
    display_value(Some(id))
}

/// Render an optional field for humans; missing fields print as `-`
pub fn display_value(value: Option<&Bson>) -> String {
    match value {
        None | Some(Bson::Null) => "-".to_string(),
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::Int32(n)) => n.to_string(),
        Some(Bson::Int64(n)) => n.to_string(),
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::DateTime(dt)) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.to_string()),
        Some(other) => other.to_string(),
    }
}
