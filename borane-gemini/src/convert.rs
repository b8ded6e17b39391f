use borane_transcript::{ImagePart, ImageSource, Message, Part, Role};

use crate::error::GeminiError;
use crate::types::{
    Blob, Content, ContentPart, GenerateContentRequest, GenerateContentResponse,
    GenerateVideosRequest, GenerationConfig, InlineImage, Operation, VideoConfig, VideoInstance,
    VideoParameters,
};

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Converts a transcript part into wire form for history replay.
///
/// Images are replayed only for user messages. Model-authored images are
/// large and the service already knows what it produced, so they are left
/// out. Videos are never replayed.
fn part_to_wire(role: Role, part: &Part) -> Option<ContentPart> {
    match part {
        Part::Text(text) => Some(ContentPart::text(text.clone())),
        Part::Image(ImagePart {
            mime_type,
            source: ImageSource::Inline { data },
            ..
        }) if role == Role::User => Some(ContentPart::inline(mime_type.clone(), data.clone())),
        Part::Image(_) | Part::Video(_) => None,
    }
}

/// Rebuilds conversation history for a content request, oldest first.
///
/// Messages that end up with no replayable parts are dropped.
pub fn history_to_contents(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .filter_map(|msg| {
            let parts: Vec<ContentPart> = msg
                .parts
                .iter()
                .filter_map(|p| part_to_wire(msg.role, p))
                .collect();
            if parts.is_empty() {
                return None;
            }
            Some(match msg.role {
                Role::User => Content::user(parts),
                Role::Model => Content::model(parts),
            })
        })
        .collect()
}

/// Builds an image generation request: history, then the prompt followed by
/// any reference images as the final user turn.
pub fn build_image_request(
    history: Vec<Content>,
    prompt: &str,
    references: &[Blob],
) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(references.len() + 1);
    parts.push(ContentPart::text(prompt));
    parts.extend(
        references
            .iter()
            .map(|blob| ContentPart::inline(blob.mime_type.clone(), blob.data.clone())),
    );

    let mut contents = history;
    contents.push(Content::user(parts));

    GenerateContentRequest {
        contents,
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
        }),
    }
}

/// Interprets a content response as transcript parts.
///
/// All images come first, then all text, each in the order the service
/// returned them. An empty result means the service produced nothing usable.
pub fn response_to_parts(response: &GenerateContentResponse) -> Vec<Part> {
    let mut images = Vec::new();
    let mut texts = Vec::new();

    let wire_parts = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter());

    for part in wire_parts {
        if let Some(blob) = &part.inline_data {
            images.push(Part::Image(ImagePart::inline(
                blob.mime_type.clone(),
                blob.data.clone(),
            )));
        } else if let Some(file) = &part.file_data {
            let mime = file.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME);
            images.push(Part::Image(ImagePart::reference(mime, file.file_uri.clone())));
        } else if let Some(text) = &part.text {
            if !text.trim().is_empty() {
                texts.push(Part::Text(text.clone()));
            }
        }
    }

    images.extend(texts);
    images
}

/// Builds a video job request for a single video.
pub fn build_video_request(
    prompt: &str,
    config: &VideoConfig,
    image: Option<InlineImage>,
) -> GenerateVideosRequest {
    GenerateVideosRequest {
        instances: vec![VideoInstance {
            prompt: prompt.to_string(),
            image,
        }],
        parameters: VideoParameters {
            aspect_ratio: config.aspect_ratio.clone(),
            resolution: config.resolution.clone(),
            duration_seconds: config.duration_seconds,
            number_of_videos: config.number_of_videos,
        },
    }
}

/// The first video produced by a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedVideo<'a> {
    pub uri: &'a str,
    pub mime_type: Option<&'a str>,
}

/// Extracts the first generated video from a finished operation.
pub fn generated_video(operation: &Operation) -> Result<GeneratedVideo<'_>, GeminiError> {
    if let Some(status) = &operation.error {
        return Err(GeminiError::Api {
            status: status.code.unwrap_or(0).max(0) as u16,
            message: status.message.clone(),
        });
    }

    let sample = operation
        .response
        .as_ref()
        .and_then(|r| r.generate_video_response.as_ref())
        .and_then(|r| r.generated_samples.first())
        .ok_or(GeminiError::NoVideos)?;

    let video = sample.video.as_ref().ok_or(GeminiError::MissingLocator)?;
    let uri = video
        .uri
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(GeminiError::MissingLocator)?;

    Ok(GeneratedVideo {
        uri,
        mime_type: video.mime_type.as_deref(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Candidate, FileData, GenerateVideoResponse, GeneratedSample, OperationResponse, Status,
        VideoRef,
    };
    use borane_transcript::Transcript;
    use serde_json::json;

    fn response_with(parts: Vec<ContentPart>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::model(parts)),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }

    #[test]
    fn test_history_replays_user_images_only() {
        let mut transcript = Transcript::new();
        transcript.append(
            Role::User,
            vec![
                Part::text("make it blue"),
                Part::Image(ImagePart::inline("image/jpeg", "USERIMG")),
            ],
        );
        transcript.append(
            Role::Model,
            vec![
                Part::Image(ImagePart::inline("image/png", "MODELIMG")),
                Part::text("here you go"),
            ],
        );

        let contents = history_to_contents(transcript.messages());
        assert_eq!(contents.len(), 2);

        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[0].parts.len(), 2);
        assert_eq!(contents[0].parts[1].inline_data.as_ref().unwrap().data, "USERIMG");

        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[1].parts, vec![ContentPart::text("here you go")]);
        let replayed_model_image = contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .any(|p| p.inline_data.as_ref().is_some_and(|b| b.data == "MODELIMG"));
        assert!(!replayed_model_image);
    }

    #[test]
    fn test_history_skips_image_only_model_messages() {
        let mut transcript = Transcript::new();
        transcript.append(Role::User, vec![Part::text("draw a cat")]);
        transcript.append(
            Role::Model,
            vec![Part::Image(ImagePart::inline("image/png", "CAT"))],
        );

        let contents = history_to_contents(transcript.messages());
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
    }

    #[test]
    fn test_build_image_request_appends_prompt_and_references() {
        let history = vec![Content::user(vec![ContentPart::text("earlier")])];
        let refs = vec![Blob {
            mime_type: "image/png".to_string(),
            data: "REF".to_string(),
        }];

        let request = build_image_request(history, "A red balloon", &refs);
        assert_eq!(request.contents.len(), 2);

        let last = request.contents.last().unwrap();
        assert_eq!(last.role.as_deref(), Some("user"));
        assert_eq!(last.parts[0].text.as_deref(), Some("A red balloon"));
        assert_eq!(last.parts[1].inline_data.as_ref().unwrap().data, "REF");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );
        assert_eq!(body["contents"][1]["parts"][1]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn test_response_places_images_before_text() {
        let response = response_with(vec![
            ContentPart::text("first caption"),
            ContentPart::inline("image/png", "IMG1"),
            ContentPart::text("second caption"),
            ContentPart {
                file_data: Some(FileData {
                    mime_type: None,
                    file_uri: "https://files.example/img2".to_string(),
                }),
                ..ContentPart::default()
            },
        ]);

        let parts = response_to_parts(&response);
        assert_eq!(parts.len(), 4);
        match &parts[0] {
            Part::Image(img) => {
                assert_eq!(img.source, ImageSource::Inline { data: "IMG1".to_string() })
            }
            other => panic!("Expected inline image, got {:?}", other),
        }
        match &parts[1] {
            Part::Image(img) => {
                assert_eq!(img.mime_type, "image/png");
                assert_eq!(
                    img.source,
                    ImageSource::Reference {
                        uri: "https://files.example/img2".to_string()
                    }
                );
            }
            other => panic!("Expected reference image, got {:?}", other),
        }
        assert_eq!(parts[2].as_text(), Some("first caption"));
        assert_eq!(parts[3].as_text(), Some("second caption"));
    }

    #[test]
    fn test_response_without_content_is_empty() {
        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(response_to_parts(&blocked).is_empty());

        let blank = response_with(vec![ContentPart::text("  ")]);
        assert!(response_to_parts(&blank).is_empty());
    }

    #[test]
    fn test_video_request_shape() {
        let config = VideoConfig {
            resolution: "720p".to_string(),
            aspect_ratio: "9:16".to_string(),
            duration_seconds: 6,
            number_of_videos: 1,
        };
        let request = build_video_request(
            "a paper boat",
            &config,
            Some(InlineImage {
                bytes_base64_encoded: "AAA".to_string(),
                mime_type: "image/png".to_string(),
            }),
        );

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["instances"][0]["prompt"], "a paper boat");
        assert_eq!(body["instances"][0]["image"]["bytesBase64Encoded"], "AAA");
        assert_eq!(body["parameters"]["aspectRatio"], "9:16");
        assert_eq!(body["parameters"]["durationSeconds"], 6);
        assert_eq!(body["parameters"]["sampleCount"], 1);
    }

    #[test]
    fn test_generated_video_extraction() {
        let op = Operation {
            name: "operations/1".to_string(),
            done: true,
            response: Some(OperationResponse {
                generate_video_response: Some(GenerateVideoResponse {
                    generated_samples: vec![GeneratedSample {
                        video: Some(VideoRef {
                            uri: Some("https://files.example/v.mp4".to_string()),
                            mime_type: None,
                        }),
                    }],
                }),
            }),
            error: None,
        };
        let video = generated_video(&op).unwrap();
        assert_eq!(video.uri, "https://files.example/v.mp4");
        assert!(video.mime_type.is_none());
    }

    #[test]
    fn test_generated_video_failures() {
        let empty = Operation {
            name: "operations/2".to_string(),
            done: true,
            ..Operation::default()
        };
        assert!(matches!(generated_video(&empty), Err(GeminiError::NoVideos)));

        let no_uri = Operation {
            name: "operations/3".to_string(),
            done: true,
            response: Some(OperationResponse {
                generate_video_response: Some(GenerateVideoResponse {
                    generated_samples: vec![GeneratedSample {
                        video: Some(VideoRef::default()),
                    }],
                }),
            }),
            error: None,
        };
        assert!(matches!(generated_video(&no_uri), Err(GeminiError::MissingLocator)));

        let failed = Operation {
            name: "operations/4".to_string(),
            done: true,
            error: Some(Status {
                code: Some(3),
                message: "prompt rejected".to_string(),
            }),
            ..Operation::default()
        };
        match generated_video(&failed) {
            Err(GeminiError::Api { status, message }) => {
                assert_eq!(status, 3);
                assert_eq!(message, "prompt rejected");
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_operation_parses_service_json() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "response": {
                "@type": "type.googleapis.com/GenerateVideoResponse",
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": "https://files.example/abc:download?alt=media" } }
                    ]
                }
            }
        }))
        .unwrap();
        assert_eq!(
            generated_video(&op).unwrap().uri,
            "https://files.example/abc:download?alt=media"
        );

        let pending: Operation =
            serde_json::from_value(json!({ "name": "models/veo/operations/abc" })).unwrap();
        assert!(!pending.done);
    }
}
