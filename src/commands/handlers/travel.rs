//! `/travel` and `/go`: bootstrap the travel assistant.

use super::sql_literal;
use crate::commands::directive::{Directive, FormatKind, PromptsView, TravelView, PROMPT_SERVER};
use crate::commands::registry::{HandlerResult, Invocation};

const CHECK_SQL: &str = "SELECT name, description, category FROM prompts \
WHERE category IN ('travel', 'system', 'travel_system', 'assistant') ORDER BY category, name";

const DB_SQL: &str = "SELECT content FROM prompts \
WHERE name IN ('travel_assistant_system', 'travel_system_prompt', 'main_travel_prompt', 'travel_agent_instructions') \
ORDER BY CASE name WHEN 'travel_assistant_system' THEN 1 WHEN 'travel_system_prompt' THEN 2 \
WHEN 'main_travel_prompt' THEN 3 ELSE 4 END LIMIT 1";

const FULL_SQL: &str = "SELECT name, content FROM prompts \
WHERE category = 'travel' OR name LIKE '%travel%' ORDER BY name";

/// Custom components and the prompt each one loads.
const COMPONENTS: &[(&str, &str)] = &[
    ("flights", "flight_booking_assistant"),
    ("hotels", "hotel_booking_assistant"),
    ("activities", "activity_planning_assistant"),
    ("itinerary", "itinerary_builder"),
    ("budget", "budget_optimizer"),
    ("safety", "travel_safety_advisor"),
    ("luxury", "luxury_travel_specialist"),
    ("business", "business_travel_assistant"),
];

pub(super) fn handle(invocation: &Invocation<'_>) -> HandlerResult {
    let args = invocation.args;

    let directive = match invocation.subcommand {
        Some("check") => Directive::query(CHECK_SQL, FormatKind::Prompts(PromptsView::List)),
        Some("db") => Directive::query(DB_SQL, FormatKind::Travel(TravelView::Init)),
        Some("full") => Directive::query(FULL_SQL, FormatKind::Travel(TravelView::FullInit)),
        Some("load") => {
            if args.is_empty() {
                return Ok("Please specify a prompt name. Usage: /travel load <prompt_name>".into());
            }
            let sql = format!(
                "SELECT content FROM prompts WHERE name = {} LIMIT 1",
                sql_literal(&args.join(" "))
            );
            Directive::query(sql, FormatKind::Travel(TravelView::LoadSpecific))
        }
        Some("setup") => return Ok(SETUP_WIZARD.into()),
        Some("help") => return Ok(INIT_HELP.into()),
        Some("custom") => return custom(args),
        _ => Directive::new(
            PROMPT_SERVER,
            "initialize_travel_assistant",
            FormatKind::Travel(TravelView::Default),
        ),
    };

    Ok(directive.into())
}

fn custom(components: &[String]) -> HandlerResult {
    if components.is_empty() {
        return Ok(CUSTOM_USAGE.into());
    }

    let selected: Vec<String> = components
        .iter()
        .filter_map(|c| {
            let c = c.to_lowercase();
            COMPONENTS.iter().find(|(name, _)| *name == c).map(|(_, prompt)| sql_literal(prompt))
        })
        .collect();

    if selected.is_empty() {
        let names: Vec<&str> = COMPONENTS.iter().map(|(name, _)| *name).collect();
        return Ok(format!("No valid components found. Available: {}", names.join(", ")).into());
    }

    let sql = format!(
        "SELECT name, content FROM prompts WHERE name IN ({}) OR (category = 'travel' AND name LIKE '%base%')",
        selected.join(", ")
    );
    Ok(Directive::query(sql, FormatKind::Travel(TravelView::CustomInit)).into())
}

const CUSTOM_USAGE: &str = "Please specify components for custom initialization.

Available components:
- `flights` - Flight search and booking
- `hotels` - Accommodation services
- `activities` - Tours and experiences
- `itinerary` - Trip planning
- `budget` - Cost optimization
- `safety` - Travel safety info
- `luxury` - Premium services
- `business` - Business travel

Example: `/travel custom flights hotels itinerary`";

const SETUP_WIZARD: &str = "# 🧙 Travel Assistant Setup Wizard

Welcome! Let's set up your travel assistant. Choose your configuration:

## 1. Quick Setup Options:

**A) Standard Travel Agent** `/travel load travel_agent_standard`
- Full-service travel planning
- Flight, hotel, and activity recommendations
- Budget optimization

**B) Luxury Travel Specialist** `/travel load luxury_travel_agent`
- High-end travel planning
- Exclusive experiences
- Premium service focus

**C) Budget Travel Expert** `/travel load budget_travel_expert`
- Cost-effective travel solutions
- Deals and savings focus
- Value optimization

**D) Adventure Travel Guide** `/travel load adventure_travel_guide`
- Outdoor and adventure focus
- Off-the-beaten-path destinations
- Activity-based planning

## 2. Custom Setup:
Use `/travel custom [components]` with any combination:
- `flights` - Flight search and booking assistance
- `hotels` - Accommodation recommendations
- `activities` - Tours and experiences
- `itinerary` - Day-by-day planning
- `budget` - Cost optimization
- `safety` - Travel advisories and safety info

Example: `/travel custom flights hotels itinerary`

## 3. Manual Setup:
- Check available prompts: `/travel check`
- Load specific prompt: `/travel load <prompt_name>`
- View prompt first: `/prompts view <prompt_name>`

What would you like to set up?";

const INIT_HELP: &str = "# Travel Assistant Initialization Options

## Quick Start:
- `/t` or `/travel` - Default initialization (uses prompt-server)
- `/go` - Alias for quick start

## Initialization Methods:
- `/travel check` - List available travel prompts
- `/travel db` - Load from database (fallback)
- `/travel full` - Load all travel-related prompts
- `/travel load <name>` - Load specific prompt by name
- `/travel setup` - Interactive setup wizard
- `/travel custom [options]` - Custom initialization

## Examples:
```
/travel check                    # See what's available
/travel load travel_agent_pro    # Load specific prompt
/travel custom flights hotels    # Custom setup
/travel setup                    # Guided setup
```

## Troubleshooting:
- If default `/t` returns unexpected content, try `/travel db`
- To see all prompts: `/prompts list`
- To search prompts: `/prompts search travel`
- To view a prompt: `/prompts view <name>`

## Creating New Prompts:
```
/prompts create my_travel_assistant
/prompts update my_travel_assistant content \"Your prompt here...\"
/prompts update my_travel_assistant category travel
```";
