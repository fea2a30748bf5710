//! Material stock: reservation engine and the stock-keeping service.
//!
//! The free functions operate on any [`ConnectionTrait`] so the order engine
//! can run them inside its own transaction. [`InventoryService`] owns the
//! transactions for direct stock operations (receipts, corrections).

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::{self, DbPool};
use crate::entities::material::Model as MaterialModel;
use crate::entities::material_ledger::{LedgerAction, Model as LedgerModel};
use crate::errors::ServiceError;
use crate::repositories::material_repository::NewLedgerEntry;
use crate::repositories::MaterialRepository;

pub const DEFAULT_LEDGER_LIMIT: u64 = 50;

/// Reserves `quantity` of a material for an order with a guarded update and
/// records the reservation in the ledger.
pub async fn reserve_material<C: ConnectionTrait>(
    conn: &C,
    material_id: i32,
    quantity: Decimal,
    order_id: i32,
    performed_by: i32,
) -> Result<(), ServiceError> {
    let materials = MaterialRepository::new(conn);

    if !materials.try_reserve(material_id, quantity).await? {
        let material = materials.get(material_id).await?;
        counter!("printshop.inventory.insufficient_stock", 1, "material" => material.code.clone());
        warn!(
            material_id,
            available = %material.available(),
            required = %quantity,
            "Reservation rejected"
        );
        return Err(ServiceError::InsufficientStock(format!(
            "Insufficient material '{}': available {:.1}, required {:.1}",
            material.name_ru,
            material.available(),
            quantity
        )));
    }

    materials
        .append_ledger(NewLedgerEntry {
            material_id,
            order_id: Some(order_id),
            action: LedgerAction::Reserve,
            quantity: -quantity,
            note: "reserved at order creation",
            performed_by,
        })
        .await?;

    counter!("printshop.inventory.reservations", 1);
    Ok(())
}

/// Returns every reservation the order still holds to available stock.
pub async fn release_order_reservations<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    performed_by: i32,
) -> Result<(), ServiceError> {
    let materials = MaterialRepository::new(conn);

    for (material_id, quantity) in reserved_lines(conn, order_id).await? {
        materials.release(material_id, quantity).await?;
        materials
            .append_ledger(NewLedgerEntry {
                material_id,
                order_id: Some(order_id),
                action: LedgerAction::Unreserve,
                quantity,
                note: "released at order cancellation",
                performed_by,
            })
            .await?;
    }
    Ok(())
}

/// Turns the reservations the order still holds into consumed stock. An
/// order whose reservations were already consumed or released moves nothing.
pub async fn consume_order_reservations<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    performed_by: i32,
) -> Result<(), ServiceError> {
    let materials = MaterialRepository::new(conn);

    for (material_id, quantity) in reserved_lines(conn, order_id).await? {
        materials.consume(material_id, quantity).await?;
        materials
            .append_ledger(NewLedgerEntry {
                material_id,
                order_id: Some(order_id),
                action: LedgerAction::Consume,
                quantity: -quantity,
                note: "consumed at production start",
                performed_by,
            })
            .await?;
    }
    Ok(())
}

/// Writes off wasted material. Only on-hand stock moves; reservations are
/// left untouched.
pub async fn write_off_defect<C: ConnectionTrait>(
    conn: &C,
    material_id: i32,
    waste: Decimal,
    order_id: Option<i32>,
    description: &str,
    performed_by: i32,
) -> Result<(), ServiceError> {
    let materials = MaterialRepository::new(conn);
    materials.adjust_quantity(material_id, -waste).await?;
    let note = format!("Defect: {}", description);
    materials
        .append_ledger(NewLedgerEntry {
            material_id,
            order_id,
            action: LedgerAction::Defect,
            quantity: -waste,
            note: &note,
            performed_by,
        })
        .await?;

    let material = materials.get(material_id).await?;
    if material.reserved > material.quantity {
        warn!(
            material_id,
            quantity = %material.quantity,
            reserved = %material.reserved,
            "Defect write-off left reservations above stock on hand"
        );
    }
    Ok(())
}

/// `(material_id, quantity)` the order still holds according to its ledger
/// entries, in material order.
async fn reserved_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<(i32, Decimal)>, ServiceError> {
    let entries = MaterialRepository::new(conn).ledger_for_order(order_id).await?;
    let mut lines: Vec<(i32, Decimal)> = outstanding_reservations(&entries)
        .into_iter()
        .filter(|(_, quantity)| *quantity > Decimal::ZERO)
        .collect();
    lines.sort_by_key(|(material_id, _)| *material_id);
    Ok(lines)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaterialView {
    pub id: i32,
    pub code: String,
    pub name_ru: String,
    pub name_ky: String,
    pub unit: String,
    pub quantity: Decimal,
    pub reserved: Decimal,
    pub available: Decimal,
    pub low_threshold: Decimal,
    pub roll_size: Decimal,
    pub is_low: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<MaterialModel> for MaterialView {
    fn from(model: MaterialModel) -> Self {
        Self {
            available: model.available(),
            is_low: model.is_low(),
            id: model.id,
            code: model.code,
            name_ru: model.name_ru,
            name_ky: model.name_ky,
            unit: model.unit,
            quantity: model.quantity,
            reserved: model.reserved,
            low_threshold: model.low_threshold,
            roll_size: model.roll_size,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryView {
    pub id: i32,
    pub material_id: i32,
    pub order_id: Option<i32>,
    pub action: LedgerAction,
    pub quantity: Decimal,
    pub note: String,
    pub performed_by: i32,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerModel> for LedgerEntryView {
    fn from(model: LedgerModel) -> Self {
        Self {
            id: model.id,
            material_id: model.material_id,
            order_id: model.order_id,
            action: model.action,
            quantity: model.quantity,
            note: model.note,
            performed_by: model.performed_by,
            created_at: model.created_at,
        }
    }
}

/// Stock movement requested through the API.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StockAdjustment {
    pub quantity: Decimal,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub note: String,
}

/// Reserved stock compared with what the ledger says is still reserved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationLine {
    pub material_id: i32,
    pub code: String,
    pub reserved: Decimal,
    pub ledger_outstanding: Decimal,
    pub difference: Decimal,
    pub consistent: bool,
}

/// Outstanding reservation per material from reserve, unreserve and
/// consume entries.
pub fn outstanding_reservations(entries: &[LedgerModel]) -> HashMap<i32, Decimal> {
    let mut outstanding: HashMap<i32, Decimal> = HashMap::new();
    for entry in entries {
        let delta = match entry.action {
            LedgerAction::Reserve => entry.quantity.abs(),
            LedgerAction::Unreserve => -entry.quantity.abs(),
            LedgerAction::Consume => -entry.quantity.abs(),
            _ => continue,
        };
        *outstanding.entry(entry.material_id).or_default() += delta;
    }
    outstanding
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_materials(&self) -> Result<Vec<MaterialView>, ServiceError> {
        let db = &*self.db_pool;
        let materials = MaterialRepository::new(db).list_all().await?;
        Ok(materials.into_iter().map(MaterialView::from).collect())
    }

    /// Materials whose available stock fell below their alert threshold.
    #[instrument(skip(self))]
    pub async fn low_stock_alerts(&self) -> Result<Vec<MaterialView>, ServiceError> {
        let db = &*self.db_pool;
        let materials = MaterialRepository::new(db).list_all().await?;
        Ok(materials
            .into_iter()
            .filter(MaterialModel::is_low)
            .map(MaterialView::from)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn ledger(
        &self,
        material_id: i32,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<LedgerEntryView>, ServiceError> {
        let db = &*self.db_pool;
        let materials = MaterialRepository::new(db);
        materials.get(material_id).await?;

        let entries = materials
            .ledger_page(
                material_id,
                limit.unwrap_or(DEFAULT_LEDGER_LIMIT).clamp(1, 500),
                offset.unwrap_or(0),
            )
            .await?;
        Ok(entries.into_iter().map(LedgerEntryView::from).collect())
    }

    #[instrument(skip(self, input), fields(quantity = %input.quantity))]
    pub async fn receive(
        &self,
        material_id: i32,
        input: StockAdjustment,
        performed_by: i32,
    ) -> Result<MaterialView, ServiceError> {
        input.validate()?;
        if input.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let txn = db::begin(&self.db_pool, "inventory.receive").await?;
        let materials = MaterialRepository::new(&txn);
        materials.get(material_id).await?;

        materials.adjust_quantity(material_id, input.quantity).await?;
        let note = non_empty_or(&input.note, "material received");
        materials
            .append_ledger(NewLedgerEntry {
                material_id,
                order_id: None,
                action: LedgerAction::Receive,
                quantity: input.quantity,
                note: &note,
                performed_by,
            })
            .await?;
        let updated = materials.get(material_id).await?;
        db::commit(txn, "inventory.receive").await?;

        info!(material_id, quantity = %input.quantity, "Material received");
        Ok(updated.into())
    }

    /// Signed stock correction. Rejected when it would leave less on hand
    /// than zero or than what open orders have reserved.
    #[instrument(skip(self, input), fields(quantity = %input.quantity))]
    pub async fn correct(
        &self,
        material_id: i32,
        input: StockAdjustment,
        performed_by: i32,
    ) -> Result<MaterialView, ServiceError> {
        input.validate()?;
        if input.quantity.is_zero() {
            return Err(ServiceError::ValidationError(
                "quantity must be non-zero".to_string(),
            ));
        }

        let txn = db::begin(&self.db_pool, "inventory.correction").await?;
        let materials = MaterialRepository::new(&txn);
        let current = materials.get(material_id).await?;

        if !materials
            .try_adjust_quantity(material_id, input.quantity)
            .await?
        {
            warn!(
                material_id,
                quantity = %current.quantity,
                reserved = %current.reserved,
                delta = %input.quantity,
                "Correction rejected"
            );
            return Err(ServiceError::InvalidOperation(format!(
                "Correction of {} would leave '{}' with {} on hand while {} is reserved",
                input.quantity,
                current.name_ru,
                current.quantity + input.quantity,
                current.reserved
            )));
        }

        let note = non_empty_or(&input.note, "stock correction");
        materials
            .append_ledger(NewLedgerEntry {
                material_id,
                order_id: None,
                action: LedgerAction::Correction,
                quantity: input.quantity,
                note: &note,
                performed_by,
            })
            .await?;
        let updated = materials.get(material_id).await?;
        db::commit(txn, "inventory.correction").await?;

        info!(material_id, delta = %input.quantity, "Stock corrected");
        Ok(updated.into())
    }

    /// Compares each material's `reserved` column with the reservations the
    /// ledger says are still outstanding. Reporting only.
    #[instrument(skip(self))]
    pub async fn reconciliation(&self) -> Result<Vec<ReconciliationLine>, ServiceError> {
        let db = &*self.db_pool;
        let repo = MaterialRepository::new(db);
        let materials = repo.list_all().await?;
        let outstanding = outstanding_reservations(&repo.reservation_movements().await?);

        let report: Vec<ReconciliationLine> = materials
            .into_iter()
            .map(|material| {
                let ledger_outstanding = outstanding
                    .get(&material.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let difference = material.reserved - ledger_outstanding;
                ReconciliationLine {
                    material_id: material.id,
                    code: material.code,
                    reserved: material.reserved,
                    ledger_outstanding,
                    difference,
                    consistent: difference.is_zero(),
                }
            })
            .collect();

        let mismatches = report.iter().filter(|line| !line.consistent).count();
        if mismatches > 0 {
            error!(mismatches, "Reserved stock disagrees with the material ledger");
        }
        Ok(report)
    }
}

fn non_empty_or(note: &str, fallback: &str) -> String {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(material_id: i32, action: LedgerAction, quantity: Decimal) -> LedgerModel {
        LedgerModel {
            id: 0,
            material_id,
            order_id: Some(1),
            action,
            quantity,
            note: String::new(),
            performed_by: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn outstanding_follows_reservation_lifecycle() {
        let entries = vec![
            entry(1, LedgerAction::Reserve, dec!(-6)),
            entry(1, LedgerAction::Reserve, dec!(-2)),
            entry(1, LedgerAction::Consume, dec!(-6)),
            entry(1, LedgerAction::Receive, dec!(100)),
            entry(2, LedgerAction::Reserve, dec!(-0.5)),
            entry(2, LedgerAction::Unreserve, dec!(0.5)),
        ];
        let outstanding = outstanding_reservations(&entries);
        assert_eq!(outstanding[&1], dec!(2));
        assert_eq!(outstanding[&2], dec!(0));
    }

    #[test]
    fn blank_note_falls_back() {
        assert_eq!(non_empty_or("  ", "stock correction"), "stock correction");
        assert_eq!(non_empty_or(" roll found ", "x"), "roll found");
    }
}
