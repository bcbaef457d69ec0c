/// Reusable popup components

use crate::protocol::SheetSummary;
use patternfly_yew::prelude::*;
use web_sys::HtmlSelectElement;
use yew::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// Transient message shown at the top of the popup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn success(message: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct StatusBannerProps {
    #[prop_or_default]
    pub status: Option<Status>,
}

#[function_component(StatusBanner)]
pub fn status_banner(props: &StatusBannerProps) -> Html {
    let Some(status) = &props.status else {
        return html! {};
    };

    let alert_type = match status.kind {
        StatusKind::Success => AlertType::Success,
        StatusKind::Error => AlertType::Danger,
    };

    html! {
        <div class="status-message">
            <Alert r#type={alert_type} title={status.message.clone()} inline={true}>
            </Alert>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SheetPickerProps {
    pub sheets: Vec<SheetSummary>,
    #[prop_or_default]
    pub selected: Option<String>,
    #[prop_or(false)]
    pub disabled: bool,
    /// Receives the chosen sheet id; never called for the placeholder
    pub onchange: Callback<String>,
}

#[function_component(SheetPicker)]
pub fn sheet_picker(props: &SheetPickerProps) -> Html {
    let onchange = {
        let onchange = props.onchange.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let id = select.value();
            if !id.is_empty() {
                onchange.emit(id);
            }
        })
    };

    let selected = props.selected.clone().unwrap_or_default();

    html! {
        <select class="sheet-select" onchange={onchange} disabled={props.disabled}>
            <option value="" selected={selected.is_empty()}>{"Choose a sheet..."}</option>
            {for props.sheets.iter().map(|sheet| html! {
                <option value={sheet.id.clone()} selected={sheet.id == selected}>{&sheet.name}</option>
            })}
        </select>
    }
}
