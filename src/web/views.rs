use super::csrf::{csrf_token, validate_csrf};
use super::prelude::*;
use super::session::{load_state, save_state};
use crate::imaging::ImageSize;
use crate::pipeline::{Action, FormInput, RenderPass};
use crate::prompt::{PromptFields, StyleTemplate};
use axum::http::Uri;
use tracing::instrument;

/// The campaign form as posted by the browser.
#[derive(Deserialize, Debug)]
pub(crate) struct CampaignForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    scene: String,
    #[serde(default)]
    style: String,
    #[serde(default)]
    mood: String,
    #[serde(default)]
    objects: String,
    #[serde(default)]
    template: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    action: String,
}

impl CampaignForm {
    fn to_input(&self) -> Result<FormInput, CampaignError> {
        let size = if self.size.trim().is_empty() {
            ImageSize::default()
        } else {
            self.size.parse::<ImageSize>().map_err(|err| {
                debug!("{}", err);
                CampaignError::BadRequest
            })?
        };
        Ok(FormInput {
            fields: PromptFields {
                scene: self.scene.clone(),
                style: self.style.clone(),
                mood: self.mood.clone(),
                objects: self.objects.clone(),
            },
            template: StyleTemplate::from_key(&self.template),
            size,
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SelectOption {
    pub(crate) value: &'static str,
    pub(crate) label: &'static str,
    pub(crate) selected: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct NoticeView {
    pub(crate) text: String,
    pub(crate) class: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    csrf_token: String,
    fields: PromptFields,
    template_options: Vec<SelectOption>,
    size_options: Vec<SelectOption>,
    assembled_prompt: String,
    has_template_text: bool,
    template_text: String,
    has_suggestion: bool,
    suggestion: String,
    notices: Vec<NoticeView>,
    has_image: bool,
    image_data_url: String,
    download_name: String,
    has_revised_prompt: bool,
    revised_prompt: String,
}

impl IndexTemplate {
    fn new(input: &FormInput, render: RenderPass, csrf_token: String) -> Self {
        let mut template_options = vec![SelectOption {
            value: "",
            label: "None",
            selected: input.template.is_none(),
        }];
        template_options.extend(StyleTemplate::ALL.into_iter().map(|template| SelectOption {
            value: template.name(),
            label: template.name(),
            selected: input.template == Some(template),
        }));
        let size_options = ImageSize::ALL
            .into_iter()
            .map(|size| SelectOption {
                value: size.as_str(),
                label: size.as_str(),
                selected: input.size == size,
            })
            .collect();

        let notices = render
            .notices
            .iter()
            .map(|notice| NoticeView {
                text: notice.text.clone(),
                class: notice.level.class(),
            })
            .collect();

        let (image_data_url, download_name, revised_prompt) = match &render.image {
            Some(offer) => (
                offer.data_url(),
                offer.file_name().to_string(),
                offer.image.revised_prompt.clone().unwrap_or_default(),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        Self {
            csrf_token,
            fields: input.fields.clone(),
            template_options,
            size_options,
            assembled_prompt: render.assembled_prompt,
            has_template_text: render.template_text.is_some(),
            template_text: render.template_text.unwrap_or_default().to_string(),
            has_suggestion: render.suggestion.is_some(),
            suggestion: render.suggestion.unwrap_or_default(),
            notices,
            has_image: render.image.is_some(),
            image_data_url,
            download_name,
            has_revised_prompt: !revised_prompt.is_empty(),
            revised_prompt,
        }
    }
}

/// handles the / GET
pub(crate) async fn index_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<IndexTemplate, CampaignError> {
    let csrf_token = csrf_token(&session).await?;
    let mut suggestion_state = load_state(&session).await?;
    let input = FormInput::initial();
    let render = state
        .pipeline
        .dispatch(&mut suggestion_state, &input, Action::Refresh)
        .await;
    Ok(IndexTemplate::new(&input, render, csrf_token))
}

/// handles the / POST, one button press per request
#[instrument(skip_all, fields(action = %form.action))]
pub(crate) async fn submit_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CampaignForm>,
) -> Result<IndexTemplate, CampaignError> {
    validate_csrf(&session, &form.csrf_token).await?;

    let action = form.action.parse::<Action>().map_err(|err| {
        debug!("{}", err);
        CampaignError::BadRequest
    })?;
    let input = form.to_input()?;

    let before = load_state(&session).await?;
    let mut after = before.clone();
    info!("Dispatching {:?} from stage {}", action, before.stage());
    let render = state.pipeline.dispatch(&mut after, &input, action).await;
    save_state(&session, &before, &after).await?;

    let csrf_token = csrf_token(&session).await?;
    Ok(IndexTemplate::new(&input, render, csrf_token))
}

pub(crate) async fn healthz_handler() -> &'static str {
    "OK"
}

pub(crate) async fn not_found_handler(uri: Uri) -> CampaignError {
    CampaignError::NotFound(uri.to_string())
}
