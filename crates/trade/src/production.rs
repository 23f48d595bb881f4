use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ricemill_stock::{Commodity, Quantity, StockMovement, TypeName, round_kg};

use crate::error::TradeError;
use crate::transaction::StockEffect;

/// One product of a milling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOutput {
    pub commodity: Commodity,
    pub type_name: TypeName,
    pub quantity: Quantity,
}

/// A milling run: paddy goes in, rice and bran come out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionBatch {
    pub batch_no: String,
    pub paddy_type: TypeName,
    pub paddy_consumed: Quantity,
    pub outputs: Vec<ProductionOutput>,
}

impl ProductionBatch {
    pub fn validate(&self) -> Result<(), TradeError> {
        if self.outputs.is_empty() {
            return Err(TradeError::NoProductionOutput);
        }
        if let Some(output) = self
            .outputs
            .iter()
            .find(|o| o.commodity == Commodity::Paddy)
        {
            return Err(TradeError::InvalidOutputCommodity(output.commodity));
        }

        let input_kg = self.paddy_consumed.total_kg()?;
        if input_kg <= Decimal::ZERO {
            return Err(TradeError::NonPositiveAmount {
                field: "paddy_consumed",
                value: input_kg,
            });
        }

        let output_kg = self.output_kg()?;
        if output_kg > input_kg {
            return Err(TradeError::OutputExceedsInput {
                output_kg,
                input_kg,
            });
        }
        Ok(())
    }

    pub fn output_kg(&self) -> Result<Decimal, TradeError> {
        sum_kg(self.outputs.iter().map(|o| &o.quantity), "output_kg")
    }

    /// Share of the paddy weight that came out as `commodity`, in percent.
    pub fn yield_percent(&self, commodity: Commodity) -> Result<Decimal, TradeError> {
        let input_kg = self.paddy_consumed.total_kg()?;
        if input_kg.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let produced = sum_kg(
            self.outputs
                .iter()
                .filter(|o| o.commodity == commodity)
                .map(|o| &o.quantity),
            "output_kg",
        )?;
        produced
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|p| p.checked_div(input_kg))
            .map(round_kg)
            .ok_or(TradeError::AmountOutOfRange {
                field: "yield_percent",
            })
    }
}

fn sum_kg<'a>(
    mut quantities: impl Iterator<Item = &'a Quantity>,
    field: &'static str,
) -> Result<Decimal, TradeError> {
    quantities.try_fold(Decimal::ZERO, |sum, q| {
        sum.checked_add(q.total_kg()?)
            .ok_or(TradeError::AmountOutOfRange { field })
    })
}

impl StockEffect for ProductionBatch {
    /// Paddy out first, then every output in.
    fn movements(&self) -> Result<Vec<StockMovement>, TradeError> {
        self.validate()?;

        let mut movements = Vec::with_capacity(self.outputs.len() + 1);
        movements.push(StockMovement::subtract(
            Commodity::Paddy,
            self.paddy_type.clone(),
            self.paddy_consumed,
        ));
        movements.extend(
            self.outputs
                .iter()
                .map(|o| StockMovement::add(o.commodity, o.type_name.clone(), o.quantity)),
        );
        Ok(movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricemill_stock::{Direction, SackSize};
    use rust_decimal_macros::dec;

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn batch(outputs: Vec<ProductionOutput>) -> ProductionBatch {
        ProductionBatch {
            batch_no: "B-12".to_string(),
            paddy_type: name("BR-28"),
            paddy_consumed: Quantity::sacks(20, SackSize::KG_50),
            outputs,
        }
    }

    fn output(commodity: Commodity, type_name: &str, kg: Decimal) -> ProductionOutput {
        ProductionOutput {
            commodity,
            type_name: name(type_name),
            quantity: Quantity::loose(kg, SackSize::KG_50).unwrap(),
        }
    }

    #[test]
    fn batch_consumes_paddy_then_adds_outputs() {
        let b = batch(vec![
            output(Commodity::Rice, "Miniket", dec!(650)),
            output(Commodity::Bran, "Fine", dec!(80)),
        ]);
        let movements = b.movements().unwrap();

        assert_eq!(movements.len(), 3);
        assert_eq!(movements[0].commodity, Commodity::Paddy);
        assert_eq!(movements[0].direction, Direction::Subtract);
        assert_eq!(movements[1].direction, Direction::Add);
        assert_eq!(movements[2].commodity, Commodity::Bran);
    }

    #[test]
    fn yield_is_share_of_paddy_weight() {
        let b = batch(vec![
            output(Commodity::Rice, "Miniket", dec!(650)),
            output(Commodity::Bran, "Fine", dec!(80)),
        ]);
        assert_eq!(b.yield_percent(Commodity::Rice).unwrap(), dec!(65));
        assert_eq!(b.yield_percent(Commodity::Bran).unwrap(), dec!(8));
    }

    #[test]
    fn oversized_outputs_are_out_of_range() {
        let b = batch(vec![
            output(Commodity::Rice, "Miniket", Decimal::MAX - dec!(5)),
            output(Commodity::Bran, "Fine", dec!(80)),
        ]);
        assert_eq!(
            b.output_kg().unwrap_err(),
            TradeError::AmountOutOfRange { field: "output_kg" }
        );
        assert_eq!(
            b.validate().unwrap_err(),
            TradeError::AmountOutOfRange { field: "output_kg" }
        );
        assert_eq!(
            b.yield_percent(Commodity::Rice).unwrap_err(),
            TradeError::AmountOutOfRange {
                field: "yield_percent"
            }
        );
    }

    #[test]
    fn batch_without_outputs_is_rejected() {
        assert_eq!(batch(vec![]).validate().unwrap_err(), TradeError::NoProductionOutput);
    }

    #[test]
    fn paddy_cannot_be_an_output() {
        let b = batch(vec![output(Commodity::Paddy, "BR-28", dec!(10))]);
        assert_eq!(
            b.validate().unwrap_err(),
            TradeError::InvalidOutputCommodity(Commodity::Paddy)
        );
    }

    #[test]
    fn outputs_cannot_outweigh_the_paddy() {
        let b = batch(vec![output(Commodity::Rice, "Miniket", dec!(1000.5))]);
        assert_eq!(
            b.validate().unwrap_err(),
            TradeError::OutputExceedsInput {
                output_kg: dec!(1000.5),
                input_kg: dec!(1000)
            }
        );
    }
}
