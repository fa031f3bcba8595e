//! PutItem, DeleteItem and UpdateItem.

use dynawire_model::input::{DeleteItemInput, PutItemInput, UpdateItemInput};
use dynawire_model::output::{DeleteItemOutput, PutItemOutput, UpdateItemOutput};
use dynawire_model::types::ReturnValue;
use dynawire_model::{DynamoDBOperation, Item};

use super::{
    ContractContext, OperationContract, check_expected, check_item, check_key, check_table_name,
    check_values,
};
use crate::error::{ClientError, invalid};

fn check_return_values_for_put_or_delete(
    return_values: Option<ReturnValue>,
) -> Result<(), ClientError> {
    match return_values {
        Some(rv) if !rv.is_allowed_for_put_or_delete() => Err(invalid(format!(
            "ReturnValues {rv} is not supported; use NONE or ALL_OLD"
        ))),
        _ => Ok(()),
    }
}

/// `Attributes` only make sense when the caller asked for them.
fn returned_attributes(
    return_values: Option<ReturnValue>,
    attributes: Option<Item>,
) -> Option<Item> {
    match return_values {
        None | Some(ReturnValue::None) => None,
        Some(_) => attributes.filter(|item| !item.is_empty()),
    }
}

/// Create or replace one item.
#[derive(Debug, Clone, Copy)]
pub struct PutItem;

impl OperationContract for PutItem {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::PutItem;
    type Input = PutItemInput;
    type Output = PutItemOutput;

    fn validate(input: &PutItemInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        check_item(&input.item, &input.table_name, ctx)?;
        check_expected(
            &input.expected,
            input.condition_expression.as_deref(),
            input.conditional_operator,
        )?;
        check_return_values_for_put_or_delete(input.return_values)?;
        check_values(&input.expression_attribute_values)
    }

    fn finish(
        input: &PutItemInput,
        mut output: PutItemOutput,
    ) -> Result<PutItemOutput, ClientError> {
        output.attributes = returned_attributes(input.return_values, output.attributes);
        Ok(output)
    }
}

/// Delete one item by primary key. Deleting a missing item succeeds.
#[derive(Debug, Clone, Copy)]
pub struct DeleteItem;

impl OperationContract for DeleteItem {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::DeleteItem;
    type Input = DeleteItemInput;
    type Output = DeleteItemOutput;

    fn validate(input: &DeleteItemInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        check_key(&input.key, &input.table_name, ctx)?;
        check_expected(
            &input.expected,
            input.condition_expression.as_deref(),
            input.conditional_operator,
        )?;
        check_return_values_for_put_or_delete(input.return_values)?;
        check_values(&input.expression_attribute_values)
    }

    fn finish(
        input: &DeleteItemInput,
        mut output: DeleteItemOutput,
    ) -> Result<DeleteItemOutput, ClientError> {
        output.attributes = returned_attributes(input.return_values, output.attributes);
        Ok(output)
    }
}

/// Edit the attributes of one item, creating it if needed.
#[derive(Debug, Clone, Copy)]
pub struct UpdateItem;

impl OperationContract for UpdateItem {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::UpdateItem;
    type Input = UpdateItemInput;
    type Output = UpdateItemOutput;

    fn validate(input: &UpdateItemInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        check_key(&input.key, &input.table_name, ctx)?;

        if !input.attribute_updates.is_empty() && input.update_expression.is_some() {
            return Err(invalid(
                "AttributeUpdates and UpdateExpression cannot be used together",
            ));
        }
        let key_schema = ctx
            .schema(&input.table_name)
            .map(|schema| &schema.key_schema);
        for (name, update) in &input.attribute_updates {
            if key_schema.is_some_and(|ks| ks.attribute_names().any(|k| k == name)) {
                return Err(invalid(format!("cannot update key attribute {name}")));
            }
            update.validate(name)?;
        }

        check_expected(
            &input.expected,
            input.condition_expression.as_deref(),
            input.conditional_operator,
        )?;
        check_values(&input.expression_attribute_values)
    }

    fn finish(
        input: &UpdateItemInput,
        mut output: UpdateItemOutput,
    ) -> Result<UpdateItemOutput, ClientError> {
        output.attributes = returned_attributes(input.return_values, output.attributes);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynawire_model::types::{AttributeAction, AttributeValueUpdate};
    use dynawire_model::{AttributeValue, Key, KeySchema, TableSchema};

    use super::*;

    fn key() -> Key {
        Key::from([("id".to_owned(), AttributeValue::from("a"))])
    }

    #[test]
    fn test_should_limit_return_values_for_put_and_delete() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let mut input = PutItemInput {
            table_name: "t".to_owned(),
            item: key(),
            return_values: Some(ReturnValue::AllNew),
            ..PutItemInput::default()
        };
        assert!(PutItem::validate(&input, &ctx).is_err());
        input.return_values = Some(ReturnValue::AllOld);
        assert!(PutItem::validate(&input, &ctx).is_ok());

        let delete = DeleteItemInput {
            table_name: "t".to_owned(),
            key: key(),
            return_values: Some(ReturnValue::UpdatedOld),
            ..DeleteItemInput::default()
        };
        assert!(DeleteItem::validate(&delete, &ctx).is_err());
    }

    #[test]
    fn test_should_drop_unrequested_attributes() {
        let input = PutItemInput {
            table_name: "t".to_owned(),
            item: key(),
            ..PutItemInput::default()
        };
        let output = PutItemOutput {
            attributes: Some(key()),
            ..PutItemOutput::default()
        };
        assert_eq!(PutItem::finish(&input, output).unwrap().attributes, None);

        let input = UpdateItemInput {
            return_values: Some(ReturnValue::AllNew),
            ..UpdateItemInput::default()
        };
        let output = UpdateItemOutput {
            attributes: Some(key()),
            ..UpdateItemOutput::default()
        };
        assert_eq!(
            UpdateItem::finish(&input, output).unwrap().attributes,
            Some(key())
        );
    }

    #[test]
    fn test_should_reject_mixed_update_styles() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let input = UpdateItemInput {
            table_name: "t".to_owned(),
            key: key(),
            update_expression: Some("SET a = :a".to_owned()),
            attribute_updates: HashMap::from([(
                "a".to_owned(),
                AttributeValueUpdate {
                    value: Some(AttributeValue::number(1)),
                    action: Some(AttributeAction::Put),
                },
            )]),
            ..UpdateItemInput::default()
        };
        assert!(UpdateItem::validate(&input, &ctx).is_err());
    }

    #[test]
    fn test_should_reject_updates_to_key_attributes() {
        let schemas = HashMap::from([(
            "t".to_owned(),
            TableSchema::new("t", KeySchema::hash_only("id")),
        )]);
        let ctx = ContractContext::new(&schemas);
        let input = UpdateItemInput {
            table_name: "t".to_owned(),
            key: key(),
            attribute_updates: HashMap::from([(
                "id".to_owned(),
                AttributeValueUpdate {
                    value: Some("b".into()),
                    action: None,
                },
            )]),
            ..UpdateItemInput::default()
        };
        assert!(UpdateItem::validate(&input, &ctx).is_err());
    }

    #[test]
    fn test_should_reject_add_without_value() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let input = UpdateItemInput {
            table_name: "t".to_owned(),
            key: key(),
            attribute_updates: HashMap::from([(
                "count".to_owned(),
                AttributeValueUpdate {
                    value: None,
                    action: Some(AttributeAction::Add),
                },
            )]),
            ..UpdateItemInput::default()
        };
        assert!(UpdateItem::validate(&input, &ctx).is_err());
    }
}
