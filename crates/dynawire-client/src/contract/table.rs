//! CreateTable, DeleteTable, DescribeTable, UpdateTable and ListTables.

use std::collections::{HashMap, HashSet};

use dynawire_model::input::{
    CreateTableInput, DeleteTableInput, DescribeTableInput, ListTablesInput, UpdateTableInput,
};
use dynawire_model::output::{
    CreateTableOutput, DeleteTableOutput, DescribeTableOutput, ListTablesOutput,
    UpdateTableOutput,
};
use dynawire_model::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, ProvisionedThroughput, TableStatus,
};
use dynawire_model::{DynamoDBOperation, KeySchema};
use tracing::warn;

use super::{ContractContext, OperationContract, check_table_name};
use crate::error::{ClientError, invalid};

/// Most local secondary indexes per table.
pub const MAX_LOCAL_SECONDARY_INDEXES: usize = 5;

/// Largest page `ListTables` accepts.
pub const MAX_LIST_TABLES_LIMIT: i32 = 100;

fn check_throughput(throughput: &ProvisionedThroughput, owner: &str) -> Result<(), ClientError> {
    if throughput.read_capacity_units < 1 || throughput.write_capacity_units < 1 {
        return Err(invalid(format!(
            "ProvisionedThroughput for {owner} must have at least 1 read and 1 write capacity unit"
        )));
    }
    Ok(())
}

/// Billing mode against the presence of a throughput setting.
fn check_billing(
    billing_mode: &BillingMode,
    throughput: Option<&ProvisionedThroughput>,
    owner: &str,
) -> Result<(), ClientError> {
    match (billing_mode, throughput) {
        (BillingMode::Provisioned, Some(t)) => check_throughput(t, owner),
        (BillingMode::Provisioned, None) => Err(invalid(format!(
            "ProvisionedThroughput is required for {owner} with PROVISIONED billing"
        ))),
        (BillingMode::PayPerRequest, Some(_)) => Err(invalid(format!(
            "ProvisionedThroughput is not allowed for {owner} with PAY_PER_REQUEST billing"
        ))),
        (BillingMode::PayPerRequest, None) => Ok(()),
        (BillingMode::Unknown(other), _) => Err(invalid(format!("unknown BillingMode {other}"))),
    }
}

/// Every key attribute must be declared with a key type.
fn check_key_attributes_defined(
    elements: &[KeySchemaElement],
    definitions: &HashMap<&str, &AttributeDefinition>,
    owner: &str,
) -> Result<KeySchema, ClientError> {
    let schema = KeySchema::from_elements(elements)
        .map_err(|e| invalid(format!("invalid KeySchema for {owner}: {e}")))?;
    for name in schema.attribute_names() {
        let definition = definitions.get(name).ok_or_else(|| {
            invalid(format!(
                "key attribute {name} of {owner} is missing from AttributeDefinitions"
            ))
        })?;
        if !definition.attribute_type.is_valid_key_type() {
            return Err(invalid(format!(
                "key attribute {name} of {owner} must be S, N or B, got {}",
                definition.attribute_type
            )));
        }
    }
    Ok(schema)
}

fn definitions_by_name(
    definitions: &[AttributeDefinition],
) -> Result<HashMap<&str, &AttributeDefinition>, ClientError> {
    let mut by_name = HashMap::with_capacity(definitions.len());
    for definition in definitions {
        if by_name
            .insert(definition.attribute_name.as_str(), definition)
            .is_some()
        {
            return Err(invalid(format!(
                "attribute {} is defined more than once",
                definition.attribute_name
            )));
        }
    }
    Ok(by_name)
}

/// Create a table and its secondary indexes.
#[derive(Debug, Clone, Copy)]
pub struct CreateTable;

impl OperationContract for CreateTable {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::CreateTable;
    type Input = CreateTableInput;
    type Output = CreateTableOutput;

    fn validate(input: &CreateTableInput, _ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        let definitions = definitions_by_name(&input.attribute_definitions)?;
        let table_owner = format!("table {}", input.table_name);
        let table_schema =
            check_key_attributes_defined(&input.key_schema, &definitions, &table_owner)?;

        let billing_mode = input.billing_mode.clone().unwrap_or_default();
        check_billing(
            &billing_mode,
            input.provisioned_throughput.as_ref(),
            &table_owner,
        )?;

        if input.local_secondary_indexes.len() > MAX_LOCAL_SECONDARY_INDEXES {
            return Err(invalid(format!(
                "at most {MAX_LOCAL_SECONDARY_INDEXES} local secondary indexes are allowed, got {}",
                input.local_secondary_indexes.len()
            )));
        }

        let mut index_names = HashSet::new();
        for gsi in &input.global_secondary_indexes {
            let owner = format!("global secondary index {}", gsi.index_name);
            if gsi.index_name.is_empty() || !index_names.insert(gsi.index_name.as_str()) {
                return Err(invalid(format!(
                    "duplicate or empty index name {:?}",
                    gsi.index_name
                )));
            }
            check_key_attributes_defined(&gsi.key_schema, &definitions, &owner)?;
            check_billing(&billing_mode, gsi.provisioned_throughput.as_ref(), &owner)?;
        }
        for lsi in &input.local_secondary_indexes {
            let owner = format!("local secondary index {}", lsi.index_name);
            if lsi.index_name.is_empty() || !index_names.insert(lsi.index_name.as_str()) {
                return Err(invalid(format!(
                    "duplicate or empty index name {:?}",
                    lsi.index_name
                )));
            }
            let schema = check_key_attributes_defined(&lsi.key_schema, &definitions, &owner)?;
            if schema.hash_key() != table_schema.hash_key() || schema.range_key().is_none() {
                return Err(invalid(format!(
                    "{owner} must share the table's partition key and define a sort key"
                )));
            }
        }
        Ok(())
    }

    fn finish(
        input: &CreateTableInput,
        output: CreateTableOutput,
    ) -> Result<CreateTableOutput, ClientError> {
        let status = output
            .table_description
            .as_ref()
            .and_then(|d| d.table_status);
        if status != Some(TableStatus::Creating) {
            warn!(
                table = %input.table_name,
                status = ?status,
                "CreateTable returned a table that is not CREATING"
            );
        }
        Ok(output)
    }
}

/// Delete a table.
#[derive(Debug, Clone, Copy)]
pub struct DeleteTable;

impl OperationContract for DeleteTable {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::DeleteTable;
    type Input = DeleteTableInput;
    type Output = DeleteTableOutput;

    fn validate(input: &DeleteTableInput, _ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)
    }
}

/// Describe a table.
#[derive(Debug, Clone, Copy)]
pub struct DescribeTable;

impl OperationContract for DescribeTable {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::DescribeTable;
    type Input = DescribeTableInput;
    type Output = DescribeTableOutput;

    fn validate(input: &DescribeTableInput, _ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)
    }
}

/// Change throughput, billing mode or global secondary indexes.
#[derive(Debug, Clone, Copy)]
pub struct UpdateTable;

impl OperationContract for UpdateTable {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::UpdateTable;
    type Input = UpdateTableInput;
    type Output = UpdateTableOutput;

    fn validate(input: &UpdateTableInput, _ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        if input.provisioned_throughput.is_none()
            && input.billing_mode.is_none()
            && input.global_secondary_index_updates.is_empty()
        {
            return Err(invalid(
                "UpdateTable requires a throughput, billing mode or index change",
            ));
        }

        let owner = format!("table {}", input.table_name);
        match (&input.billing_mode, &input.provisioned_throughput) {
            (Some(BillingMode::PayPerRequest), Some(_)) => {
                return Err(invalid(format!(
                    "ProvisionedThroughput is not allowed for {owner} with PAY_PER_REQUEST billing"
                )));
            }
            (Some(BillingMode::Unknown(other)), _) => {
                return Err(invalid(format!("unknown BillingMode {other}")));
            }
            (_, Some(throughput)) => check_throughput(throughput, &owner)?,
            _ => {}
        }

        let definitions = definitions_by_name(&input.attribute_definitions)?;
        let mut touched = HashSet::new();
        for update in &input.global_secondary_index_updates {
            let index_name = update.validate()?;
            if !touched.insert(index_name) {
                return Err(invalid(format!(
                    "index {index_name} appears in more than one GlobalSecondaryIndexUpdate"
                )));
            }
            let owner = format!("global secondary index {index_name}");
            if let Some(create) = &update.create {
                check_key_attributes_defined(&create.key_schema, &definitions, &owner)?;
                if let Some(throughput) = &create.provisioned_throughput {
                    check_throughput(throughput, &owner)?;
                }
            }
            if let Some(change) = &update.update {
                check_throughput(&change.provisioned_throughput, &owner)?;
            }
        }
        Ok(())
    }
}

/// List table names, one page at a time.
#[derive(Debug, Clone, Copy)]
pub struct ListTables;

impl OperationContract for ListTables {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::ListTables;
    type Input = ListTablesInput;
    type Output = ListTablesOutput;

    fn validate(input: &ListTablesInput, _ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        if let Some(limit) = input.limit {
            if !(1..=MAX_LIST_TABLES_LIMIT).contains(&limit) {
                return Err(invalid(format!(
                    "Limit must be between 1 and {MAX_LIST_TABLES_LIMIT}, got {limit}"
                )));
            }
        }
        if input
            .exclusive_start_table_name
            .as_deref()
            .is_some_and(str::is_empty)
        {
            return Err(invalid("ExclusiveStartTableName must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dynawire_model::types::{
        DeleteGlobalSecondaryIndexAction, GlobalSecondaryIndexUpdate, LocalSecondaryIndex,
        Projection, ScalarAttributeType, TableDescription, UpdateGlobalSecondaryIndexAction,
    };

    use super::*;

    fn definition(name: &str, ty: ScalarAttributeType) -> AttributeDefinition {
        AttributeDefinition {
            attribute_name: name.to_owned(),
            attribute_type: ty,
        }
    }

    fn create_input() -> CreateTableInput {
        CreateTableInput {
            table_name: "orders".to_owned(),
            key_schema: vec![KeySchemaElement::hash("pk"), KeySchemaElement::range("sk")],
            attribute_definitions: vec![
                definition("pk", ScalarAttributeType::S),
                definition("sk", ScalarAttributeType::N),
            ],
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: 5,
                write_capacity_units: 5,
            }),
            ..CreateTableInput::default()
        }
    }

    fn ctx_validate(input: &CreateTableInput) -> Result<(), ClientError> {
        let schemas = HashMap::new();
        CreateTable::validate(input, &ContractContext::new(&schemas))
    }

    #[test]
    fn test_should_accept_valid_create_table() {
        assert!(ctx_validate(&create_input()).is_ok());
    }

    #[test]
    fn test_should_require_defined_key_attributes() {
        let mut input = create_input();
        input.attribute_definitions.pop();
        assert!(ctx_validate(&input).is_err());

        let mut input = create_input();
        input.key_schema = vec![KeySchemaElement::range("sk")];
        assert!(ctx_validate(&input).is_err());
    }

    #[test]
    fn test_should_match_throughput_to_billing_mode() {
        let mut input = create_input();
        input.provisioned_throughput = None;
        assert!(ctx_validate(&input).is_err());

        input.billing_mode = Some(BillingMode::PayPerRequest);
        assert!(ctx_validate(&input).is_ok());

        input.provisioned_throughput = Some(ProvisionedThroughput {
            read_capacity_units: 1,
            write_capacity_units: 1,
        });
        assert!(ctx_validate(&input).is_err());
    }

    #[test]
    fn test_should_limit_local_secondary_indexes() {
        let mut input = create_input();
        input
            .attribute_definitions
            .push(definition("alt", ScalarAttributeType::S));
        let lsi = |n: usize| LocalSecondaryIndex {
            index_name: format!("lsi-{n}"),
            key_schema: vec![KeySchemaElement::hash("pk"), KeySchemaElement::range("alt")],
            projection: Projection::default(),
        };
        input.local_secondary_indexes = (0..5).map(lsi).collect();
        assert!(ctx_validate(&input).is_ok());

        input.local_secondary_indexes.push(lsi(5));
        assert!(ctx_validate(&input).is_err());

        input.local_secondary_indexes = vec![lsi(0), lsi(0)];
        assert!(ctx_validate(&input).is_err());
    }

    #[test]
    fn test_should_require_a_change_for_update_table() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let mut input = UpdateTableInput {
            table_name: "orders".to_owned(),
            ..UpdateTableInput::default()
        };
        assert!(UpdateTable::validate(&input, &ctx).is_err());

        input.global_secondary_index_updates = vec![GlobalSecondaryIndexUpdate {
            delete: Some(DeleteGlobalSecondaryIndexAction {
                index_name: "old".to_owned(),
            }),
            ..GlobalSecondaryIndexUpdate::default()
        }];
        assert!(UpdateTable::validate(&input, &ctx).is_ok());

        input.global_secondary_index_updates[0].update = Some(UpdateGlobalSecondaryIndexAction {
            index_name: "old".to_owned(),
            provisioned_throughput: ProvisionedThroughput {
                read_capacity_units: 1,
                write_capacity_units: 1,
            },
        });
        assert!(UpdateTable::validate(&input, &ctx).is_err());
    }

    #[test]
    fn test_should_bound_list_tables_limit() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        for (limit, ok) in [(0, false), (1, true), (100, true), (101, false)] {
            let input = ListTablesInput {
                limit: Some(limit),
                ..ListTablesInput::default()
            };
            assert_eq!(ListTables::validate(&input, &ctx).is_ok(), ok, "limit {limit}");
        }
    }

    #[test]
    fn test_should_pass_through_unexpected_create_status() {
        let output = CreateTableOutput {
            table_description: Some(TableDescription {
                table_status: Some(TableStatus::Active),
                ..TableDescription::default()
            }),
        };
        let finished = CreateTable::finish(&create_input(), output.clone()).unwrap();
        assert_eq!(finished, output);
    }
}
