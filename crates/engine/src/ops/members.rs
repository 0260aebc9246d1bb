use sea_orm::{ActiveValue, QueryFilter, prelude::*};

use super::Engine;
use crate::{EngineError, ResultEngine, members};

impl Engine {
    /// Looks up a member by username, for request authentication.
    pub async fn member_by_username(
        &self,
        username: &str,
    ) -> ResultEngine<Option<members::Model>> {
        let member = members::Entity::find()
            .filter(members::Column::Username.eq(username))
            .one(&self.database)
            .await?;
        Ok(member)
    }

    pub async fn member(&self, id: i32) -> ResultEngine<members::Model> {
        members::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("member {id}")))
    }

    /// Resolves the signer stamped on an export's `#GEN` line.
    ///
    /// The signer was validated when the export was requested, so a missing
    /// row at processing time means the reference data changed underneath us.
    pub(super) async fn find_signer(&self, member_id: i32) -> ResultEngine<members::Model> {
        members::Entity::find_by_id(member_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::Configuration(format!("export signer member {member_id} is gone"))
            })
    }

    /// Creates a member. Usernames are unique; the password arrives already
    /// hashed.
    pub async fn create_member(
        &self,
        username: &str,
        password_hash: &str,
        firstname: &str,
        lastname: &str,
        export_permission: bool,
    ) -> ResultEngine<members::Model> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::InvalidRequest(
                "username must not be empty".to_string(),
            ));
        }

        let member = members::ActiveModel {
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(password_hash.to_string()),
            firstname: ActiveValue::Set(firstname.to_string()),
            lastname: ActiveValue::Set(lastname.to_string()),
            export_permission: ActiveValue::Set(export_permission),
            ..Default::default()
        };
        let member = member.insert(&self.database).await?;
        Ok(member)
    }
}
