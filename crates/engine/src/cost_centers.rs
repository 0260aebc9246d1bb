//! Cost-center dimension values referenced by allocation rules.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transaction_cost_centers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub cost_center: String,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocation_rules::Entity")]
    AllocationRules,
}

impl Related<super::allocation_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AllocationRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
