use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::db::{self, DbPool};
use crate::entities::incident::{self, IncidentStatus, IncidentType, Model as IncidentModel};
use crate::errors::ServiceError;
use crate::repositories::{IncidentRepository, OrderRepository, UserRepository};
use crate::services::inventory;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateIncidentRequest {
    /// Staff member the incident is recorded against
    pub user_id: i32,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub order_id: Option<i32>,
    #[serde(default)]
    pub material_waste: Decimal,
    #[serde(default)]
    pub deduction_amount: Decimal,
}

pub const INCIDENT_LIST_LIMIT: u64 = 200;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncidentListQuery {
    pub status: Option<IncidentStatus>,
    pub user_id: Option<i32>,
    /// First day included, `YYYY-MM-DD`
    pub date_from: Option<NaiveDate>,
    /// Last day included, `YYYY-MM-DD`
    pub date_to: Option<NaiveDate>,
    /// Only incidents that carry a salary deduction
    #[serde(default)]
    pub penalties_only: bool,
}

impl IncidentListQuery {
    fn condition(&self) -> Result<Condition, ServiceError> {
        use incident::Column;

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ServiceError::InvalidInput(format!(
                    "date_from {} is after date_to {}",
                    from, to
                )));
            }
        }

        let mut condition = Condition::all();
        if let Some(status) = self.status {
            condition = condition.add(Column::Status.eq(status));
        }
        if let Some(user_id) = self.user_id {
            condition = condition.add(Column::UserId.eq(user_id));
        }
        if let Some(from) = self.date_from {
            condition = condition.add(Column::CreatedAt.gte(start_of(from)));
        }
        if let Some(to) = self.date_to {
            let next_day = to
                .succ_opt()
                .ok_or_else(|| ServiceError::InvalidInput(format!("date_to {} out of range", to)))?;
            condition = condition.add(Column::CreatedAt.lt(start_of(next_day)));
        }
        if self.penalties_only {
            condition = condition.add(Column::DeductionAmount.gt(Decimal::ZERO));
        }
        Ok(condition)
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncidentView {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub description: String,
    pub order_id: Option<i32>,
    pub material_waste: Decimal,
    pub deduction_amount: Decimal,
    pub status: IncidentStatus,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

impl From<IncidentModel> for IncidentView {
    fn from(model: IncidentModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            incident_type: model.incident_type,
            description: model.description,
            order_id: model.order_id,
            material_waste: model.material_waste,
            deduction_amount: model.deduction_amount,
            status: model.status,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

impl CreateIncidentRequest {
    /// Defects with waste against an order write off material.
    fn writes_off_material(&self) -> Option<i32> {
        match (self.incident_type, self.order_id) {
            (IncidentType::Defect, Some(order_id)) if self.material_waste > Decimal::ZERO => {
                Some(order_id)
            }
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct IncidentService {
    db_pool: Arc<DbPool>,
}

impl IncidentService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(user_id = request.user_id, kind = ?request.incident_type))]
    pub async fn create(
        &self,
        request: CreateIncidentRequest,
        created_by: i32,
    ) -> Result<IncidentView, ServiceError> {
        request.validate()?;
        if request.material_waste < Decimal::ZERO || request.deduction_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "material_waste and deduction_amount must not be negative".to_string(),
            ));
        }

        let txn = db::begin(&self.db_pool, "incidents.create").await?;

        UserRepository::new(&txn)
            .find_by_id(request.user_id)
            .await?
            .ok_or_else(|| ServiceError::ValidationError(format!("Unknown user {}", request.user_id)))?;

        if let Some(order_id) = request.order_id {
            OrderRepository::new(&txn)
                .find_by_id(order_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        }

        let incident = IncidentRepository::new(&txn)
            .insert(incident::ActiveModel {
                user_id: Set(request.user_id),
                incident_type: Set(request.incident_type),
                description: Set(request.description.trim().to_string()),
                order_id: Set(request.order_id),
                material_waste: Set(request.material_waste),
                deduction_amount: Set(request.deduction_amount),
                status: Set(IncidentStatus::Pending),
                created_by: Set(created_by),
                created_at: Set(Utc::now()),
                ..Default::default()
            })
            .await?;

        if let Some(order_id) = request.writes_off_material() {
            let items = OrderRepository::new(&txn).items(order_id).await?;
            match items.iter().find_map(|item| item.material_id) {
                Some(material_id) => {
                    inventory::write_off_defect(
                        &txn,
                        material_id,
                        request.material_waste,
                        Some(order_id),
                        &incident.description,
                        created_by,
                    )
                    .await?;
                    counter!("printshop.inventory.defect_writeoffs", 1);
                }
                None => warn!(order_id, "Defect reported for an order without material"),
            }
        }

        db::commit(txn, "incidents.create").await?;
        info!(incident_id = incident.id, "Incident recorded");
        Ok(incident.into())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: IncidentListQuery) -> Result<Vec<IncidentView>, ServiceError> {
        let condition = query.condition()?;
        let db = &*self.db_pool;
        let incidents = IncidentRepository::new(db)
            .list(condition, INCIDENT_LIST_LIMIT)
            .await?;
        Ok(incidents.into_iter().map(IncidentView::from).collect())
    }

    /// Marks an incident as reviewed. Reviewing twice is a no-op.
    #[instrument(skip(self))]
    pub async fn review(&self, id: i32, reviewed_by: i32) -> Result<IncidentView, ServiceError> {
        let txn = db::begin(&self.db_pool, "incidents.review").await?;
        let incidents = IncidentRepository::new(&txn);
        let incident = incidents
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Incident {} not found", id)))?;

        if incident.status == IncidentStatus::Reviewed {
            return Ok(incident.into());
        }

        let reviewed = incidents.set_status(incident, IncidentStatus::Reviewed).await?;
        db::commit(txn, "incidents.review").await?;

        counter!("printshop.incidents.reviewed", 1);
        info!(incident_id = id, reviewed_by, "Incident reviewed");
        Ok(reviewed.into())
    }
}
