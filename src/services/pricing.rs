//! Line pricing and the material units a line draws on.

use rust_decimal::Decimal;

use crate::entities::order::ClientType;
use crate::entities::service::Model as ServiceModel;
use crate::errors::ServiceError;

const AREA_UNIT_MARKERS: [&str; 4] = ["м2", "м²", "m2", "m²"];

/// Whether a unit label denotes area-based pricing (square meters).
pub fn is_area_unit(unit: &str) -> bool {
    let normalized: String = unit
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    AREA_UNIT_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
}

/// Dealer clients pay the dealer price when the service has one.
pub fn unit_price_for(service: &ServiceModel, client_type: ClientType) -> Decimal {
    if client_type == ClientType::Dealer && service.price_dealer > Decimal::ZERO {
        service.price_dealer
    } else {
        service.price_retail
    }
}

/// Priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineQuote {
    pub unit_price: Decimal,
    pub total: Decimal,
    /// Billable units: square meters for area services, pieces otherwise.
    pub units: Decimal,
}

pub fn quote_line(
    service: &ServiceModel,
    client_type: ClientType,
    quantity: Decimal,
    width: Option<Decimal>,
    height: Option<Decimal>,
) -> Result<LineQuote, ServiceError> {
    let unit_price = unit_price_for(service, client_type);
    let (total, units) = calculate(&service.unit, unit_price, quantity, width, height)?;
    Ok(LineQuote {
        unit_price,
        total,
        units,
    })
}

/// Returns `(total, units)` for a line.
pub fn calculate(
    unit: &str,
    unit_price: Decimal,
    quantity: Decimal,
    width: Option<Decimal>,
    height: Option<Decimal>,
) -> Result<(Decimal, Decimal), ServiceError> {
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "quantity must be positive".to_string(),
        ));
    }

    let units = if is_area_unit(unit) {
        match (width, height) {
            (Some(w), Some(h)) if w > Decimal::ZERO && h > Decimal::ZERO => w * h * quantity,
            _ => {
                return Err(ServiceError::ValidationError(
                    "missing dimensions".to_string(),
                ))
            }
        }
    } else {
        quantity
    };

    Ok((units * unit_price, units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn service(unit: &str, retail: Decimal, dealer: Decimal) -> ServiceModel {
        ServiceModel {
            id: 1,
            code: "banner".into(),
            name_ru: "Баннер".into(),
            name_ky: "Баннер".into(),
            category: "banner".into(),
            unit: unit.into(),
            price_retail: retail,
            price_dealer: dealer,
            cost_price: dec!(150),
            min_order: dec!(1),
            options: None,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case("м²", true)]
    #[case("М2", true)]
    #[case("m 2", true)]
    #[case("кв. m²", true)]
    #[case("шт", false)]
    #[case("лист", false)]
    #[case("см", false)]
    fn classifies_area_units(#[case] unit: &str, #[case] area: bool) {
        assert_eq!(is_area_unit(unit), area);
    }

    #[rstest]
    #[case("м²", dec!(450), dec!(1), Some(dec!(2)), Some(dec!(3)), dec!(2700), dec!(6))]
    #[case("м²", dec!(450), dec!(2), Some(dec!(2)), Some(dec!(3)), dec!(5400), dec!(12))]
    #[case("шт", dec!(5), dec!(20), None, None, dec!(100), dec!(20))]
    #[case("шт", dec!(350), dec!(2), Some(dec!(9)), None, dec!(700), dec!(2))]
    fn prices_lines(
        #[case] unit: &str,
        #[case] price: Decimal,
        #[case] quantity: Decimal,
        #[case] width: Option<Decimal>,
        #[case] height: Option<Decimal>,
        #[case] total: Decimal,
        #[case] units: Decimal,
    ) {
        assert_eq!(
            calculate(unit, price, quantity, width, height).unwrap(),
            (total, units)
        );
    }

    #[test]
    fn area_line_of_two_by_three_meters() {
        // 2 x 3 m, qty 1 => 6 m² at 450
        let (total, units) = calculate("м²", dec!(450), dec!(1), Some(dec!(2)), Some(dec!(3))).unwrap();
        assert_eq!(units, dec!(6));
        assert_eq!(total, dec!(2700));
    }

    #[rstest]
    #[case(None, Some(dec!(3)))]
    #[case(Some(dec!(2)), None)]
    #[case(Some(dec!(0)), Some(dec!(3)))]
    #[case(Some(dec!(2)), Some(dec!(-1)))]
    fn area_unit_requires_positive_dimensions(
        #[case] width: Option<Decimal>,
        #[case] height: Option<Decimal>,
    ) {
        assert_matches!(
            calculate("м²", dec!(450), dec!(1), width, height),
            Err(ServiceError::ValidationError(msg)) if msg == "missing dimensions"
        );
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert_matches!(
            calculate("шт", dec!(5), dec!(0), None, None),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn dealer_price_applies_only_when_set() {
        let with_dealer = service("м²", dec!(450), dec!(300));
        let without_dealer = service("шт", dec!(5), dec!(0));

        assert_eq!(unit_price_for(&with_dealer, ClientType::Dealer), dec!(300));
        assert_eq!(unit_price_for(&with_dealer, ClientType::Retail), dec!(450));
        assert_eq!(unit_price_for(&without_dealer, ClientType::Dealer), dec!(5));
    }

    #[test]
    fn quote_uses_tier_price() {
        let svc = service("м²", dec!(450), dec!(300));
        let quote = quote_line(&svc, ClientType::Dealer, dec!(1), Some(dec!(2)), Some(dec!(3))).unwrap();
        assert_eq!(
            quote,
            LineQuote {
                unit_price: dec!(300),
                total: dec!(1800),
                units: dec!(6),
            }
        );
    }
}
