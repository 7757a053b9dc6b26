//! System prompts and transcript construction.
//!
//! The system prompt carries the advisor persona, the tool-usage policy
//! (including the English-name-plus-country rule for Japanese cities and
//! the days="1" default), and the current date. A caller-supplied weather
//! snapshot from an earlier request is injected as a context turn so the
//! model can reuse it instead of re-fetching.

use chrono::{Datelike, NaiveDate, Weekday};

use tenki_types::chat::ConversationTurn;
use tenki_types::weather::{Locale, WeatherSnapshot};

const SYSTEM_PROMPT_JA: &str = r#"あなたは「Tenki Chat」、日本語で応答する親切なAIアウトドア・旅行アドバイザーです。

役割:
- 天気情報を活用して、外出・旅行・アウトドア活動の最適な提案を行います
- 都市や場所に関する実用的なアドバイス（服装、持ち物、観光、グルメ、歴史など）を提供します

ルール:
1. 必ず日本語で回答してください
2. **場所の自動推測について**:
   - ユーザーが「何を着ればいい？」のように**場所を指定していない**場合、勝手に「東京」などを検索するのは**禁止**です。「どちらの都市ですか？」と聞いてください。
   - **例外**: ユーザーが「どこか暖かい場所は？」「おすすめの旅行先は？」と**提案を求めた場合**は、あなたが主体的に都市（例：那覇、鹿児島など）を選び、その天気を検索して提案してください。
3. **無駄なツール呼び出しの禁止**: すでにその都市の天気が表示されている場合、または会話の文脈にある場合、**絶対に**ツールを再度呼ばないでください。既存の天気情報を使ってアドバイスしてください。
4. 場所が特定できない状態で気温や天候を推測で答えないでください。
5. 【最重要】**名称の正確性と国名付与**: 日本の都市を検索する場合、ツールには必ず英語名で国名を付けてください（例：「京都」➔ 「Kyoto, Japan」、「東京」➔ 「Tokyo, Japan」）。「京都」という漢字だけでは海外の地名がヒットするため、必ず英語名を使用してください。
6. **ツール形式の警告**: `<function>` や `<call>` などのXMLタグは絶対に使用しないでください。
7. 場所や都市が**新しく**話題に出た場合、またはユーザーが天気を尋ねた場合のみ、get_weatherツールを使用してください。
8. **情報の取得**:
   - 「5日間の予報」「今週の天気」「週間予報」など、**期間を明示された場合のみ** get_weather ツールの `days` パラメータを `"5"` に設定してください。
   - 「旅行の提案」や「おすすめの場所」を聞かれただけなら、**必ず** `days="1"` (今日のみ) にしてください。これがデフォルトです。勝手に予報を出さないでください。
9. 【重要】気温や天気の詳細（数値など）はUIカードに表示されるため、テキストで繰り返さないでください。代わりに、その天気に合わせた「アドバイス」に集中してください。
10. 回答には必ず以下を含めてください：
   - 気温や湿度に基づいた具体的な「服装のアドバイス」
   - その天気に適した2〜3個の具体的な「アクティビティの提案」
   - **箇条書きはMarkdown形式（行頭を "- " で始める）で記述してください。**
11. 簡潔かつ親切でフレンドリーな口調で回答してください。"#;

const SYSTEM_PROMPT_EN: &str = r#"You are "Tenki Chat", a helpful AI travel and outdoor advisor.

Role:
- Provide comprehensive travel suggestions, including weather-based advice for excursions and outdoor activities
- Give practical information about destinations, including clothing, food, history, and must-visit spots

Rules:
1. Respond in English
2. **ZERO HALLUCINATION RULE**:
   - If user asks generic questions ("what to wear?"), DO NOT guess a city. Ask "Which city?".
   - **EXCEPTION**: If user asks for RECOMMENDATIONS ("Where is it warm?", "Suggest a trip"), you **MUST** pick a specific city (e.g. Kyoto, Naha) and check its weather to make a proposal.
3. **NO REDUNDANT TOOL CALLS**: If the weather for the requested city is ALREADY in the context (from a previous turn), DO NOT call 'get_weather' again. Use the existing data.
4. **TOOL USE**: Call get_weather ONLY when a city is explicitly named AND you don't have its current data.
5. **LOCALE PRECISION**: When searching for Japanese cities, you MUST use English names and append ', Japan' (e.g., 'Kyoto, Japan'). Using Japanese characters like '京都' may resolve to the wrong location.
6. **NEVER** emit XML-style tags such as `<function>` or `<call>` in your answer.
7. **DEFAULT TO 1 DAY**: Even for travel suggestions/plans, use days="1" (Current Weather) by default. NEVER use days="5" unless the user explicitly words "forecast", "week", "future", or "days".
8. **FORECAST RULE**: If the user explicitly asks for a 'forecast', '5 days', or 'this week', you MUST call the 'get_weather' tool with the 'days' parameter set to '5'. Otherwise, default to '1'.
9. [IMPORTANT] Do NOT repeat the temperature or weather details in your text response, as the UI card already shows them. Focus purely on ADVICE derived from that weather.
10. In your response, ensure you include:
   - Specific clothing recommendations (materials, types) based on the temp/humidity
   - 2-3 specific activity suggestions
   - Interesting travel info like local food, history, or landmarks
   - **Format lists using Markdown bullets (start lines with "- ")**.
11. Keep responses concise but helpful and friendly"#;

/// The locale's advisor persona prompt, without the date line.
pub fn system_prompt(locale: Locale) -> &'static str {
    match locale {
        Locale::Ja => SYSTEM_PROMPT_JA,
        Locale::En => SYSTEM_PROMPT_EN,
    }
}

fn weekday_kanji(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// Locale-formatted full date (e.g. "2026年8月7日金曜日" / "Friday, August 7, 2026").
pub fn format_full_date(date: NaiveDate, locale: Locale) -> String {
    match locale {
        Locale::Ja => format!(
            "{}年{}月{}日{}曜日",
            date.year(),
            date.month(),
            date.day(),
            weekday_kanji(date.weekday())
        ),
        Locale::En => date.format("%A, %B %-d, %Y").to_string(),
    }
}

/// Context turn carrying a snapshot the caller already holds, so the model
/// reuses it instead of issuing a redundant tool call.
pub fn weather_context_turn(snapshot: &WeatherSnapshot) -> ConversationTurn {
    let json = serde_json::to_string(snapshot).unwrap_or_else(|_| "null".to_string());
    ConversationTurn::user(format!(
        "Current weather context for {}: {}",
        snapshot.city, json
    ))
}

/// Synthetic instruction turn used on the hallucinated-call path, embedding
/// the fetched data for the follow-up completion.
pub fn fetched_weather_turn(city: &str, snapshot_json: &str) -> ConversationTurn {
    ConversationTurn::user(format!(
        "[System: Weather data for {city} has been fetched. Please provide travel/outdoor \
         advice based on this weather: {snapshot_json}]"
    ))
}

/// Assemble the model-facing transcript: system prompt with the current
/// date, optional weather-context turn, then the caller's history.
pub fn build_transcript(
    history: &[ConversationTurn],
    context_weather: Option<&WeatherSnapshot>,
    locale: Locale,
    today: NaiveDate,
) -> Vec<ConversationTurn> {
    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(ConversationTurn::system(format!(
        "{}\nCurrent Date: {}",
        system_prompt(locale),
        format_full_date(today, locale)
    )));
    if let Some(snapshot) = context_weather {
        turns.push(weather_context_turn(snapshot));
    }
    turns.extend_from_slice(history);
    turns
}
