//! The built-in marketplace datasets

use std::fmt;

use martline_core::{CleaningStep, ColumnType, DatasetDefinition};

/// Built-in dataset kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Geolocation,
    OrderItems,
    OrderPayment,
    OrderReviews,
    Orders,
    ProductTranslation,
    Products,
    Sellers,
    Customers,
}

impl Builtin {
    /// Parse from dataset name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Geolocation => "geolocation",
            Self::OrderItems => "order_items",
            Self::OrderPayment => "order_payment",
            Self::OrderReviews => "order_reviews",
            Self::Orders => "orders",
            Self::ProductTranslation => "product_translation",
            Self::Products => "products",
            Self::Sellers => "sellers",
            Self::Customers => "customers",
        }
    }

    /// Source file name under the base URL
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ProductTranslation => "product_category_name_translation.csv",
            Self::Geolocation => "geolocation_dataset.csv",
            Self::OrderItems => "order_items_dataset.csv",
            Self::OrderPayment => "order_payment_dataset.csv",
            Self::OrderReviews => "order_reviews_dataset.csv",
            Self::Orders => "orders_dataset.csv",
            Self::Products => "products_dataset.csv",
            Self::Sellers => "sellers_dataset.csv",
            Self::Customers => "customers_dataset.csv",
        }
    }

    pub fn all() -> &'static [Builtin] {
        &[
            Self::Geolocation,
            Self::OrderItems,
            Self::OrderPayment,
            Self::OrderReviews,
            Self::Orders,
            Self::ProductTranslation,
            Self::Products,
            Self::Sellers,
            Self::Customers,
        ]
    }

    /// Full definition, reading from `base_url`.
    pub fn definition(&self, base_url: &str) -> DatasetDefinition {
        let uri = join_uri(base_url, self.file_name());
        let name = self.name();
        match self {
            Self::Geolocation => DatasetDefinition::new(
                name,
                uri,
                &[
                    "geolocation_zip_code_prefix",
                    "geolocation_lat",
                    "geolocation_lng",
                    "geolocation_city",
                    "geolocation_state",
                ],
            )
            .with_steps(location_steps("geolocation_city", "geolocation_state")),

            Self::OrderItems => DatasetDefinition::new(
                name,
                uri,
                &[
                    "order_id",
                    "order_item_id",
                    "product_id",
                    "seller_id",
                    "shipping_limit_date",
                    "price",
                    "freight_value",
                ],
            )
            .with_steps(vec![CleaningStep::BlankToNull, CleaningStep::DedupeRows]),

            Self::OrderPayment => DatasetDefinition::new(
                name,
                uri,
                &[
                    "order_id",
                    "payment_sequential",
                    "payment_type",
                    "payment_installments",
                    "payment_value",
                ],
            )
            .with_type("order_id", ColumnType::String)
            .with_type("payment_sequential", ColumnType::Integer)
            .with_type("payment_type", ColumnType::String)
            .with_type("payment_installments", ColumnType::Integer)
            .with_type("payment_value", ColumnType::Float)
            .with_steps(vec![
                CleaningStep::BlankToNull,
                CleaningStep::DedupeRows,
                CleaningStep::value_remap("payment_type", "credit_card", "credit card"),
                CleaningStep::value_remap("payment_type", "debit_card", "debit card"),
                CleaningStep::title_case("payment_type"),
            ]),

            Self::OrderReviews => DatasetDefinition::new(
                name,
                uri,
                &[
                    "review_id",
                    "order_id",
                    "review_score",
                    "review_comment_title",
                    "review_comment_message",
                    "review_creation_date",
                    "review_answer_timestamp",
                ],
            )
            .with_steps(vec![
                CleaningStep::BlankToNull,
                CleaningStep::title_case("review_comment_title"),
                CleaningStep::lower_case("review_comment_message"),
                CleaningStep::strip_punctuation("review_comment_message"),
                CleaningStep::DedupeRows,
            ]),

            Self::Orders => DatasetDefinition::new(
                name,
                uri,
                &[
                    "order_id",
                    "customer_id",
                    "order_status",
                    "order_purchase_timestamp",
                    "order_approved_at",
                    "order_delivered_carrier_date",
                    "order_delivered_customer_date",
                    "order_delivered_delivery_date",
                ],
            )
            .with_steps(vec![
                CleaningStep::BlankToNull,
                CleaningStep::title_case("order_status"),
                CleaningStep::DedupeRows,
            ]),

            Self::ProductTranslation => DatasetDefinition::new(
                name,
                uri,
                &["product_category_name", "product_category_name_english"],
            )
            .with_type("product_category_name", ColumnType::String)
            .with_type("product_category_name_english", ColumnType::String)
            .with_steps(vec![
                CleaningStep::BlankToNull,
                CleaningStep::title_case("product_category_name"),
                CleaningStep::title_case("product_category_name_english"),
                CleaningStep::replace_literal("product_category_name", "_", " "),
                CleaningStep::replace_literal("product_category_name_english", "_", " "),
                CleaningStep::DedupeRows,
            ]),

            Self::Products => DatasetDefinition::new(
                name,
                uri,
                &[
                    "product_id",
                    "product_category_name",
                    "product_name_lenght",
                    "product_description_lenght",
                    "product_photos_qty",
                    "product_weight_g",
                    "product_length_cm",
                    "product_height_cm",
                    "product_width_cm",
                ],
            )
            .with_steps(vec![
                CleaningStep::BlankToNull,
                CleaningStep::title_case("product_category_name"),
                CleaningStep::replace_literal("product_category_name", "_", " "),
                CleaningStep::DedupeRows,
            ]),

            Self::Sellers => DatasetDefinition::new(
                name,
                uri,
                &["seller_id", "seller_zip_code", "seller_city", "seller_state"],
            )
            .with_type("seller_id", ColumnType::String)
            .with_type("seller_zip_code", ColumnType::Integer)
            .with_type("seller_city", ColumnType::String)
            .with_type("seller_state", ColumnType::String)
            .with_steps(location_steps("seller_city", "seller_state")),

            Self::Customers => DatasetDefinition::new(
                name,
                uri,
                &[
                    "customer_id",
                    "customer_unique_id",
                    "customer_zip_code_prefix",
                    "customer_city",
                    "customer_state",
                ],
            )
            .with_steps(location_steps("customer_city", "customer_state")),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// blank, dedupe, title-case city, upper-case state
fn location_steps(city: &str, state: &str) -> Vec<CleaningStep> {
    vec![
        CleaningStep::BlankToNull,
        CleaningStep::DedupeRows,
        CleaningStep::title_case(city),
        CleaningStep::upper_case(state),
    ]
}

/// Append a file name to a base URL or directory.
pub fn join_uri(base: &str, file: &str) -> String {
    if base.is_empty() {
        file.to_string()
    } else if base.ends_with('/') {
        format!("{base}{file}")
    } else {
        format!("{base}/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Builtin::from_name("orders"), Some(Builtin::Orders));
        assert_eq!(Builtin::from_name("ORDER_PAYMENT"), Some(Builtin::OrderPayment));
        assert_eq!(Builtin::from_name("payments"), None);
    }

    #[test]
    fn nine_builtins_with_unique_names() {
        let mut names: Vec<_> = Builtin::all().iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn translation_reads_its_own_file() {
        let def = Builtin::ProductTranslation.definition("https://example.org/raw/");
        assert_eq!(
            def.source_uri(),
            "https://example.org/raw/product_category_name_translation.csv"
        );
    }

    #[test]
    fn join_uri_handles_separators() {
        assert_eq!(join_uri("data/raw", "orders_dataset.csv"), "data/raw/orders_dataset.csv");
        assert_eq!(join_uri("data/raw/", "orders_dataset.csv"), "data/raw/orders_dataset.csv");
        assert_eq!(join_uri("", "orders_dataset.csv"), "orders_dataset.csv");
    }

    #[test]
    fn payment_remaps_run_before_title_case() {
        let def = Builtin::OrderPayment.definition("");
        let kinds: Vec<_> = def.steps().iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            ["blank-to-null", "dedupe-rows", "value-remap", "value-remap", "title-case"]
        );
        assert_eq!(def.declared_type("payment_value"), Some(ColumnType::Float));
    }

    #[test]
    fn every_step_targets_a_declared_column() {
        for b in Builtin::all() {
            let def = b.definition("");
            for step in def.steps() {
                if let Some(column) = step.column() {
                    assert!(
                        def.columns().iter().any(|c| c == column),
                        "{b}: {step} targets unknown column"
                    );
                }
            }
            for column in def.column_types().keys() {
                assert!(def.columns().contains(column), "{b}: typed column {column}");
            }
        }
    }
}
