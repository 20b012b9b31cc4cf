// Data transformation pipeline.
//
// Pure functions over DataTable, each yielding a new table, plus the
// per-shape preparation entry points the orchestrator calls. Errors use
// the ChartError taxonomy so a shape failure stays recoverable.

use std::collections::HashMap;
use tracing::warn;

use crate::data::{format_number, parse_number, DataTable};
use crate::error::ChartError;
use crate::plan::{ChartPlan, LongFormatRoles, MultiColumnRoles, TwoColumnRoles};
use crate::precision;
use crate::shape::{BubblePoint, BubbleShape, MultiColumnShape, TwoColumnShape};

fn find_column(table: &DataTable, name: &str) -> Result<usize, ChartError> {
    table
        .column_index(name)
        .ok_or_else(|| ChartError::missing_column(name))
}

/// Drop the last row when the oracle flags it as a pre-computed total.
/// Must run before aggregation, which would double-count the total.
pub fn drop_trailing_total(table: &DataTable) -> DataTable {
    let mut rows = table.rows.clone();
    rows.pop();
    DataTable::new(table.headers.clone(), rows)
}

/// Group rows by the category column, summing every other column
/// numerically. Group order follows first appearance. Non-numeric cells
/// contribute zero and are logged.
pub fn aggregate_by_category(table: &DataTable, category: &str) -> Result<DataTable, ChartError> {
    let category_col = find_column(table, category)?;
    let value_cols: Vec<usize> = (0..table.headers.len())
        .filter(|&c| c != category_col)
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, Vec<f64>> = HashMap::new();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let key = row.get(category_col).cloned().unwrap_or_default();
        let entry = sums.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            vec![0.0; value_cols.len()]
        });
        for (slot, &col) in value_cols.iter().enumerate() {
            let cell = row.get(col).map(String::as_str).unwrap_or("");
            if cell.trim().is_empty() {
                continue;
            }
            match parse_number(cell) {
                Some(v) => entry[slot] += v,
                None => warn!(
                    row = row_idx,
                    column = %table.headers[col],
                    cell = %cell,
                    "non-numeric cell ignored during aggregation"
                ),
            }
        }
    }

    let mut headers = vec![table.headers[category_col].clone()];
    headers.extend(value_cols.iter().map(|&c| table.headers[c].clone()));

    let rows = order
        .into_iter()
        .map(|key| {
            let mut row = vec![key.clone()];
            row.extend(sums[&key].iter().map(|v| format_number(*v)));
            row
        })
        .collect();

    Ok(DataTable::new(headers, rows))
}

fn sort_by_key(table: &DataTable, mut key: impl FnMut(&DataTable, usize) -> f64, descending: bool) -> DataTable {
    let mut indices: Vec<usize> = (0..table.row_count()).collect();
    let keys: Vec<f64> = indices.iter().map(|&i| key(table, i)).collect();
    indices.sort_by(|&a, &b| {
        let ordering = keys[a]
            .partial_cmp(&keys[b])
            .unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    let rows = indices.into_iter().map(|i| table.rows[i].clone()).collect();
    DataTable::new(table.headers.clone(), rows)
}

/// Stable ascending sort by a single value column.
pub fn sort_ascending_by_column(table: &DataTable, value: &str) -> Result<DataTable, ChartError> {
    let col = find_column(table, value)?;
    Ok(sort_by_key(
        table,
        |t, row| t.numeric_cell(row, col).unwrap_or(0.0),
        false,
    ))
}

/// Stable descending sort by a single value column. Pie and doughnut
/// always use this, post-normalization, regardless of the natural-order
/// flag: proportion charts read largest-slice-first.
pub fn sort_descending_by_column(table: &DataTable, value: &str) -> Result<DataTable, ChartError> {
    let col = find_column(table, value)?;
    Ok(sort_by_key(
        table,
        |t, row| t.numeric_cell(row, col).unwrap_or(0.0),
        true,
    ))
}

/// Stable ascending sort by the row-wise sum across series columns.
pub fn sort_ascending_by_row_sum(
    table: &DataTable,
    series: &[String],
) -> Result<DataTable, ChartError> {
    let cols: Vec<usize> = series
        .iter()
        .map(|s| find_column(table, s))
        .collect::<Result<_, _>>()?;
    Ok(sort_by_key(
        table,
        |t, row| {
            cols.iter()
                .map(|&c| t.numeric_cell(row, c).unwrap_or(0.0))
                .sum()
        },
        false,
    ))
}

/// Divide each value by the column total, yielding fractions for
/// pie/doughnut shapes.
pub fn normalize_single_column(table: &DataTable, value: &str) -> Result<DataTable, ChartError> {
    let col = find_column(table, value)?;
    let total: f64 = table.numeric_column(col).iter().sum();

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut row = row.clone();
            if total != 0.0 {
                if let Some(v) = table.numeric_cell(row_idx, col) {
                    row[col] = format!("{}", v / total);
                }
            }
            row
        })
        .collect();

    Ok(DataTable::new(table.headers.clone(), rows))
}

/// Divide each row's series values by that row's cross-series sum and
/// multiply by 100, for 100%-stacked shapes.
pub fn normalize_rows_to_percent(
    table: &DataTable,
    series: &[String],
) -> Result<DataTable, ChartError> {
    let cols: Vec<usize> = series
        .iter()
        .map(|s| find_column(table, s))
        .collect::<Result<_, _>>()?;

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut row = row.clone();
            let row_sum: f64 = cols
                .iter()
                .map(|&c| table.numeric_cell(row_idx, c).unwrap_or(0.0))
                .sum();
            if row_sum != 0.0 {
                for &c in &cols {
                    let v = table.numeric_cell(row_idx, c).unwrap_or(0.0);
                    row[c] = format!("{}", v / row_sum * 100.0);
                }
            }
            row
        })
        .collect();

    Ok(DataTable::new(table.headers.clone(), rows))
}

/// Pivot a long table wide: one row per distinct index value, one column
/// per distinct "columns" value, populated from "values". Duplicate
/// (index, columns) pairs are ill-defined and fail instead of silently
/// dropping rows. Absent pairs fill with zero.
pub fn long_to_wide(
    table: &DataTable,
    index: &str,
    columns: &str,
    values: &str,
) -> Result<DataTable, ChartError> {
    let index_col = find_column(table, index)?;
    let columns_col = find_column(table, columns)?;
    let values_col = find_column(table, values)?;

    let mut index_order: Vec<String> = Vec::new();
    let mut column_order: Vec<String> = Vec::new();
    let mut cells: HashMap<(String, String), String> = HashMap::new();

    for row in &table.rows {
        let index_value = row.get(index_col).cloned().unwrap_or_default();
        let column_value = row.get(columns_col).cloned().unwrap_or_default();
        let cell_value = row.get(values_col).cloned().unwrap_or_default();

        if !index_order.contains(&index_value) {
            index_order.push(index_value.clone());
        }
        if !column_order.contains(&column_value) {
            column_order.push(column_value.clone());
        }

        let key = (index_value.clone(), column_value.clone());
        if cells.insert(key, cell_value).is_some() {
            return Err(ChartError::ReshapeConflict {
                index: index_value,
                column: column_value,
            });
        }
    }

    let mut headers = vec![table.headers[index_col].clone()];
    headers.extend(column_order.iter().cloned());

    let rows = index_order
        .into_iter()
        .map(|index_value| {
            let mut row = vec![index_value.clone()];
            for column_value in &column_order {
                let cell = cells
                    .get(&(index_value.clone(), column_value.clone()))
                    .cloned()
                    .unwrap_or_else(|| "0".to_string());
                row.push(cell);
            }
            row
        })
        .collect();

    Ok(DataTable::new(headers, rows))
}

// --- Shape preparation entry points ---

/// Prepare the two-column shape: drop-total, aggregate, sort, resolve
/// precision.
pub fn prepare_two_column(
    table: &DataTable,
    roles: &TwoColumnRoles,
    last_row_is_total: bool,
) -> Result<TwoColumnShape, ChartError> {
    let table = if last_row_is_total {
        drop_trailing_total(table)
    } else {
        table.clone()
    };

    let aggregated = aggregate_by_category(&table, &roles.category)?;
    find_column(&aggregated, &roles.value)?;

    let sorted = if roles.has_natural_order {
        aggregated
    } else {
        sort_ascending_by_column(&aggregated, &roles.value)?
    };

    let precision = precision::resolve(&sorted, &[roles.value.as_str()]);
    Ok(TwoColumnShape {
        table: sorted,
        roles: roles.clone(),
        precision,
    })
}

fn prepare_multi_column_wide(
    table: &DataTable,
    roles: &MultiColumnRoles,
) -> Result<MultiColumnShape, ChartError> {
    if roles.series.is_empty() {
        return Err(ChartError::EmptySeriesSet);
    }

    let aggregated = aggregate_by_category(table, &roles.category)?;
    for name in &roles.series {
        find_column(&aggregated, name)?;
    }

    let sorted = if roles.has_natural_order {
        aggregated
    } else {
        sort_ascending_by_row_sum(&aggregated, &roles.series)?
    };

    let series_refs: Vec<&str> = roles.series.iter().map(String::as_str).collect();
    let precision = precision::resolve(&sorted, &series_refs);
    Ok(MultiColumnShape {
        table: sorted,
        category: roles.category.clone(),
        series: roles.series.clone(),
        axis_label: roles.axis_label.clone(),
        unit: roles.unit.clone(),
        precision,
    })
}

fn prepare_multi_column_long(
    table: &DataTable,
    roles: &LongFormatRoles,
) -> Result<MultiColumnShape, ChartError> {
    let wide = long_to_wide(table, &roles.index, &roles.variable, &roles.value)?;

    // Reshaped headers decide the roles: first header is the category,
    // the rest are series.
    let category = wide.headers[0].clone();
    let series: Vec<String> = wide.headers[1..].to_vec();
    if series.is_empty() {
        return Err(ChartError::EmptySeriesSet);
    }

    let sorted = if roles.has_natural_order {
        wide
    } else {
        sort_ascending_by_row_sum(&wide, &series)?
    };

    let series_refs: Vec<&str> = series.iter().map(String::as_str).collect();
    let precision = precision::resolve(&sorted, &series_refs);
    Ok(MultiColumnShape {
        table: sorted,
        category,
        series,
        axis_label: roles.axis_label.clone(),
        unit: roles.unit.clone(),
        precision,
    })
}

/// Prepare the multi-column shape, reshaping first when the plan flags
/// long-format input.
pub fn prepare_multi_column(
    table: &DataTable,
    plan: &ChartPlan,
) -> Result<MultiColumnShape, ChartError> {
    let table = if plan.last_row_is_total {
        drop_trailing_total(table)
    } else {
        table.clone()
    };

    if plan.is_long_format {
        let roles = plan
            .long_format
            .as_ref()
            .ok_or_else(|| ChartError::missing_column("<long-format role mapping>"))?;
        prepare_multi_column_long(&table, roles)
    } else {
        let roles = plan
            .multi_column
            .as_ref()
            .ok_or_else(|| ChartError::missing_column("<multi-column role mapping>"))?;
        prepare_multi_column_wide(&table, roles)
    }
}

/// Prepare the bubble shape: keep the four role-mapped columns in
/// label/x/y/size order, scaling fractions to percentage points where
/// the role flags say so.
pub fn prepare_bubble(table: &DataTable, plan: &ChartPlan) -> Result<BubbleShape, ChartError> {
    let roles = plan
        .bubble
        .as_ref()
        .ok_or_else(|| ChartError::missing_column("<bubble role mapping>"))?;

    let label_col = find_column(table, &roles.label_column)?;
    let x_col = find_column(table, &roles.x_column)?;
    let y_col = find_column(table, &roles.y_column)?;
    let size_col = find_column(table, &roles.size_column)?;

    let points = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut x = table.numeric_cell(row_idx, x_col).unwrap_or(0.0);
            let mut y = table.numeric_cell(row_idx, y_col).unwrap_or(0.0);
            if roles.x_is_percentage {
                x *= 100.0;
            }
            if roles.y_is_percentage {
                y *= 100.0;
            }
            BubblePoint {
                label: row.get(label_col).cloned().unwrap_or_default(),
                x,
                y,
                size: table.numeric_cell(row_idx, size_col).unwrap_or(0.0),
            }
        })
        .collect();

    Ok(BubbleShape {
        points,
        roles: roles.clone(),
    })
}
