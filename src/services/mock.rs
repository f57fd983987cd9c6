use crate::services::api::{ContinueRequest, GeneratedEpisode, IdeasRequest, NovelBackend, StoryRequest};
use anyhow::Result;
use async_trait::async_trait;

const DEMO_IDEAS: &str = "アイデア1:\n\
概要：魔法学校で特殊な能力を持つ少年の成長物語\n\
舞台：魔法が日常的に使われる異世界の学園\n\n\
アイデア2:\n\
概要：記憶を失った少女が自分の過去を探る冒険\n\
舞台：記憶を管理する組織が存在する近未来都市\n\n\
アイデア3:\n\
概要：古い洋館に住む不思議な老人と訪れた少年の交流\n\
舞台：山奥の古い洋館と周辺の森";

/// Offline backend with canned responses.
#[derive(Debug, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }
}

fn demo_episode(episode_number: usize, genre: Option<&str>, previous_summary: Option<&str>) -> GeneratedEpisode {
    let genre = genre.filter(|g| !g.is_empty()).unwrap_or("ファンタジー");
    let opening = match previous_summary {
        Some(summary) if !summary.is_empty() => format!("　前回のあらすじ：{}\n\n", summary),
        _ => String::new(),
    };

    GeneratedEpisode {
        novel_text: format!(
            "{}　これは{}の物語の第{}話である。窓の外には見慣れない景色が広がっていた。\n\n　「ここから始まるんだ」\n\n　主人公は小さく呟き、一歩を踏み出した。",
            opening, genre, episode_number
        ),
        summary: format!("{}の物語、第{}話。主人公が新たな一歩を踏み出す。", genre, episode_number),
        title: format!("第{}話", episode_number),
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl NovelBackend for MockBackend {
    async fn generate_ideas(&self, _request: &IdeasRequest) -> Result<String> {
        Ok(DEMO_IDEAS.to_string())
    }

    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedEpisode> {
        Ok(demo_episode(1, Some(request.genre.as_str()), None))
    }

    async fn continue_story(&self, request: &ContinueRequest) -> Result<GeneratedEpisode> {
        Ok(demo_episode(
            request.episode_number,
            request.genre.as_deref(),
            Some(request.previous_summary.as_str()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::SessionData;

    #[tokio::test]
    async fn test_mock_titles_follow_episode_number() -> Result<()> {
        let backend = MockBackend::new();

        let first = backend.generate_story(&StoryRequest::default()).await?;
        assert_eq!(first.title, "第1話");

        let request = ContinueRequest::from_session(&SessionData::default(), &first.summary, 2);
        let second = backend.continue_story(&request).await?;
        assert_eq!(second.title, "第2話");
        assert!(second.novel_text.contains(&first.summary));

        let ideas = backend
            .generate_ideas(&IdeasRequest {
                genre: "sf".to_string(),
                model_choice: "xai".to_string(),
            })
            .await?;
        assert!(ideas.contains("アイデア3"));
        Ok(())
    }
}
