//! Default catalog, materials and bootstrap account for an empty database.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::Set;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db::{self, DbPool};
use crate::entities::{material, service, Role};
use crate::errors::ServiceError;
use crate::repositories::{CatalogRepository, MaterialRepository, UserRepository};
use crate::services::users::{create_user, NewUser};

struct ServiceSeed {
    code: &'static str,
    name_ru: &'static str,
    name_ky: &'static str,
    category: &'static str,
    unit: &'static str,
    retail: Decimal,
    dealer: Decimal,
    cost: Decimal,
    min_order: Decimal,
    options: fn() -> serde_json::Value,
}

struct MaterialSeed {
    code: &'static str,
    name_ru: &'static str,
    name_ky: &'static str,
    unit: &'static str,
    low_threshold: Decimal,
    roll_size: Decimal,
}

fn no_options() -> serde_json::Value {
    json!({})
}

fn services() -> Vec<ServiceSeed> {
    vec![
        ServiceSeed { code: "banner", name_ru: "Баннер", name_ky: "Баннер", category: "banner", unit: "м²", retail: dec!(450), dealer: dec!(300), cost: dec!(150), min_order: dec!(1), options: || json!({"eyelets": 50}) },
        ServiceSeed { code: "vinyl", name_ru: "Самоклейка", name_ky: "Өзү жабышчаак", category: "vinyl", unit: "м²", retail: dec!(600), dealer: dec!(400), cost: dec!(200), min_order: dec!(1), options: no_options },
        ServiceSeed { code: "mesh", name_ru: "Сеточная самоклейка", name_ky: "Тор өзү жабышчаак", category: "mesh", unit: "м²", retail: dec!(700), dealer: dec!(500), cost: dec!(250), min_order: dec!(1), options: no_options },
        ServiceSeed { code: "table", name_ru: "Таблички (ПВХ)", name_ky: "Табличкалар (ПВХ)", category: "table", unit: "шт", retail: dec!(350), dealer: dec!(0), cost: dec!(100), min_order: dec!(1), options: no_options },
        ServiceSeed { code: "forex", name_ru: "Стенды Forex", name_ky: "Forex стенддери", category: "stand", unit: "м²", retail: dec!(2000), dealer: dec!(1800), cost: dec!(800), min_order: dec!(1), options: no_options },
        ServiceSeed { code: "letters", name_ru: "Объемные буквы", name_ky: "Көлөмдүү тамгалар", category: "letters", unit: "см", retail: dec!(50), dealer: dec!(0), cost: dec!(15), min_order: dec!(1), options: || json!({"calc_by": "height"}) },
        ServiceSeed { code: "plotter", name_ru: "Плоттерная резка", name_ky: "Плоттердик кесүү", category: "plotter", unit: "м²", retail: dec!(1000), dealer: dec!(0), cost: dec!(300), min_order: dec!(1), options: no_options },
        ServiceSeed { code: "dtf", name_ru: "DTF печать", name_ky: "DTF басып чыгаруу", category: "dtf", unit: "шт", retail: dec!(350), dealer: dec!(0), cost: dec!(100), min_order: dec!(1), options: || json!({"sleeve_price": 150}) },
        ServiceSeed { code: "menu_a4", name_ru: "Меню A4", name_ky: "Меню A4", category: "menu", unit: "лист", retail: dec!(150), dealer: dec!(0), cost: dec!(50), min_order: dec!(5), options: || json!({"double_lamination": 200}) },
        ServiceSeed { code: "vizit_1", name_ru: "Визитки 1 стор.", name_ky: "Визитка 1 тарап", category: "business_card", unit: "шт", retail: dec!(5), dealer: dec!(0), cost: dec!(1), min_order: dec!(20), options: no_options },
        ServiceSeed { code: "vizit_2", name_ru: "Визитки 2 стор.", name_ky: "Визитка 2 тарап", category: "business_card", unit: "шт", retail: dec!(6), dealer: dec!(0), cost: dec!(2), min_order: dec!(20), options: no_options },
        ServiceSeed { code: "photo_a4", name_ru: "Фото A4", name_ky: "Сүрөт A4", category: "photo", unit: "шт", retail: dec!(50), dealer: dec!(0), cost: dec!(15), min_order: dec!(1), options: no_options },
        ServiceSeed { code: "photo_a3", name_ru: "Фото A3", name_ky: "Сүрөт A3", category: "photo", unit: "шт", retail: dec!(150), dealer: dec!(0), cost: dec!(40), min_order: dec!(1), options: no_options },
    ]
}

fn materials() -> Vec<MaterialSeed> {
    vec![
        MaterialSeed { code: "banner_roll", name_ru: "Баннерная ткань", name_ky: "Баннер кездеме", unit: "м²", low_threshold: dec!(10), roll_size: dec!(50) },
        MaterialSeed { code: "vinyl_roll", name_ru: "Самоклейка", name_ky: "Өзү жабышчаак", unit: "м²", low_threshold: dec!(10), roll_size: dec!(50) },
        MaterialSeed { code: "mesh_roll", name_ru: "Сеточная самоклейка", name_ky: "Тор өзү жабышчаак", unit: "м²", low_threshold: dec!(10), roll_size: dec!(50) },
        MaterialSeed { code: "oracal_roll", name_ru: "Плоттерная пленка", name_ky: "Плоттер пленкасы", unit: "м²", low_threshold: dec!(5), roll_size: dec!(25) },
        MaterialSeed { code: "dtf_film", name_ru: "DTF пленка", name_ky: "DTF пленка", unit: "м²", low_threshold: dec!(5), roll_size: dec!(100) },
    ]
}

/// `(service code, material code, material units per service unit)`.
/// A DTF print uses roughly an A4 sheet of film.
const MATERIAL_MAP: [(&str, &str, Decimal); 5] = [
    ("banner", "banner_roll", dec!(1.0)),
    ("vinyl", "vinyl_roll", dec!(1.0)),
    ("mesh", "mesh_roll", dec!(1.0)),
    ("plotter", "oracal_roll", dec!(1.0)),
    ("dtf", "dtf_film", dec!(0.09)),
];

/// Seeds the catalog when no services exist and the bootstrap director when
/// no users exist. Safe to call on every start.
#[instrument(skip(pool, admin_password))]
pub async fn seed_defaults(pool: &DbPool, admin_password: Option<&str>) -> Result<(), ServiceError> {
    let txn = db::begin(pool, "seed.defaults").await?;

    if UserRepository::new(&txn).count().await? == 0 {
        match admin_password {
            Some(password) if !password.is_empty() => {
                create_user(
                    &txn,
                    NewUser {
                        username: "admin".to_string(),
                        password: password.to_string(),
                        full_name: "Director".to_string(),
                        role: Role::Director,
                        phone: None,
                    },
                )
                .await?;
                info!("Bootstrap director 'admin' created");
            }
            _ => warn!("No users exist and bootstrap_admin_password is unset; skipping admin account"),
        }
    }

    let catalog = CatalogRepository::new(&txn);
    if catalog.count_services().await? == 0 {
        let now = Utc::now();
        for seed in services() {
            catalog
                .insert_service(service::ActiveModel {
                    code: Set(seed.code.to_string()),
                    name_ru: Set(seed.name_ru.to_string()),
                    name_ky: Set(seed.name_ky.to_string()),
                    category: Set(seed.category.to_string()),
                    unit: Set(seed.unit.to_string()),
                    price_retail: Set(seed.retail),
                    price_dealer: Set(seed.dealer),
                    cost_price: Set(seed.cost),
                    min_order: Set(seed.min_order),
                    options: Set(Some((seed.options)())),
                    is_active: Set(true),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .await?;
        }

        let stock = MaterialRepository::new(&txn);
        for seed in materials() {
            stock
                .insert(material::ActiveModel {
                    code: Set(seed.code.to_string()),
                    name_ru: Set(seed.name_ru.to_string()),
                    name_ky: Set(seed.name_ky.to_string()),
                    unit: Set(seed.unit.to_string()),
                    quantity: Set(Decimal::ZERO),
                    reserved: Set(Decimal::ZERO),
                    low_threshold: Set(seed.low_threshold),
                    roll_size: Set(seed.roll_size),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .await?;
        }

        for (service_code, material_code, ratio) in MATERIAL_MAP {
            let service = catalog.find_service_by_code(service_code).await?;
            let material = stock.find_by_code(material_code).await?;
            if let (Some(service), Some(material)) = (service, material) {
                catalog.map_material(service.id, material.id, ratio).await?;
            }
        }
        info!(services = services().len(), materials = materials().len(), "Default catalog seeded");
    }

    db::commit(txn, "seed.defaults").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::is_area_unit;
    use std::collections::HashSet;

    #[test]
    fn seed_codes_are_unique() {
        let codes: HashSet<_> = services().iter().map(|s| s.code).collect();
        assert_eq!(codes.len(), services().len());
        let codes: HashSet<_> = materials().iter().map(|m| m.code).collect();
        assert_eq!(codes.len(), materials().len());
    }

    #[test]
    fn every_mapping_points_at_seeded_rows() {
        let services: HashSet<_> = services().iter().map(|s| s.code).collect();
        let materials: HashSet<_> = materials().iter().map(|m| m.code).collect();
        for (service, material, ratio) in MATERIAL_MAP {
            assert!(services.contains(service), "{service}");
            assert!(materials.contains(material), "{material}");
            assert!(ratio > Decimal::ZERO);
        }
    }

    #[test]
    fn banner_is_area_priced() {
        let banner = services().into_iter().find(|s| s.code == "banner").unwrap();
        assert!(is_area_unit(banner.unit));
        assert_eq!(banner.retail, dec!(450));
    }
}
