use axum::extract::{Form, State};
use recipe_core::chart::render_chart;
use recipe_core::search::{report_rows, ChartType, FormErrors, SearchForm};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::session::{CurrentUser, SessionUser};
use crate::state::AppState;
use crate::templates::{chart_choices, difficulty_choices, SearchTemplate};

fn search_page_for(user: SessionUser, form: SearchForm, errors: FormErrors) -> SearchTemplate {
    SearchTemplate {
        user: Some(user),
        difficulty_choices: difficulty_choices(&form.difficulty),
        chart_choices: chart_choices(&form.chart_type),
        form,
        errors,
        searched: false,
        rows: Vec::new(),
        chart: None,
    }
}

pub async fn search_page(CurrentUser(user): CurrentUser) -> SearchTemplate {
    let form = SearchForm {
        chart_type: ChartType::None.code().to_string(),
        ..SearchForm::default()
    };
    search_page_for(user, form, FormErrors::new())
}

/// Validate, filter, tabulate, chart.
pub async fn search_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<SearchForm>,
) -> AppResult<SearchTemplate> {
    let query = match form.validate() {
        Ok(query) => query,
        Err(errors) => return Ok(search_page_for(user, form, errors)),
    };

    let recipes = state.storage.search_recipes(&query.filter).await?;
    let rows = report_rows(&recipes);
    info!(
        user = %user.username,
        matches = rows.len(),
        chart = query.chart_type.label(),
        "Recipe search"
    );

    // Chart failures are logged; the table still renders.
    let chart = match render_chart(query.chart_type, &rows) {
        Ok(chart) => chart,
        Err(e) => {
            warn!("Chart rendering failed: {}", e);
            None
        }
    };

    let mut page = search_page_for(user, form, FormErrors::new());
    page.searched = true;
    page.rows = rows;
    page.chart = chart;
    Ok(page)
}
